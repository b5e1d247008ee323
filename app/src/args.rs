//! Command line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use mugprint_texturing::export::DEFAULT_MOCKUP_FILE_NAME;
use mugprint_texturing::{DesignError, DesignSpec, ImageSource, Rgb};

#[derive(Parser, Debug)]
#[command(
    name = "mugprint",
    about = "Compose mug designs and preview them on 3D mug models",
    long_about = "Compose a print design (image + text) onto the mug's print area, bind it\n\
        to the printable material of a glTF mug model and export PNG mockups.\n\
        \n\
        EXAMPLES:\n\
          # List the materials of a model and which one receives the design\n\
          mugprint inspect mug.glb\n\
        \n\
          # Render text on the built-in mug\n\
          mugprint render --text \"Café\" --text-color \"#202020\"\n\
        \n\
          # Render a saved design on a model, also writing the flat design\n\
          mugprint render --model mug.glb --design design.ron --design-out print.png",
    version
)]
pub struct Cli {
    /// RON configuration file (defaults to ./mugprint.ron when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List a model's material slots and the one the design would go on
    Inspect {
        /// glTF or GLB file
        model: PathBuf,
    },
    /// Compose a design, bind it to a mug and export PNGs
    Render(RenderArgs),
}

#[derive(Args, Debug)]
pub struct RenderArgs {
    /// glTF or GLB mug model (a procedural mug is used when omitted)
    #[arg(long)]
    pub model: Option<PathBuf>,

    /// RON design file; the flags below override its fields
    #[arg(long)]
    pub design: Option<PathBuf>,

    /// Text line drawn centered on the print area
    #[arg(long)]
    pub text: Option<String>,

    /// Image file for the image layer
    #[arg(long)]
    pub image: Option<PathBuf>,

    /// Text color as #rgb or #rrggbb
    #[arg(long)]
    pub text_color: Option<Rgb>,

    /// Font family, resolved through the configured fonts
    #[arg(long)]
    pub font_family: Option<String>,

    /// Horizontal wrap offset around the mug, 0..1
    #[arg(long)]
    pub wrap_offset: Option<f32>,

    /// Mockup background color as #rgb or #rrggbb
    #[arg(long)]
    pub background: Option<Rgb>,

    /// Mockup PNG path
    #[arg(short, long, default_value = DEFAULT_MOCKUP_FILE_NAME)]
    pub out: PathBuf,

    /// Also write the flat print-ready design PNG here
    #[arg(long)]
    pub design_out: Option<PathBuf>,

    #[arg(long, default_value = "1024")]
    pub width: u32,

    #[arg(long, default_value = "512")]
    pub height: u32,

    /// Render to a surface that discards its buffer (export will fail)
    #[arg(long, hide = true)]
    pub no_preserve_buffer: bool,
}

impl RenderArgs {
    /// The design file (or the default design) with command line overrides.
    pub fn design_spec(&self) -> Result<DesignSpec, DesignError> {
        let mut spec = match &self.design {
            Some(path) => DesignSpec::load(path)?,
            None => DesignSpec::default(),
        };
        if let Some(text) = &self.text {
            spec.text = Some(text.clone());
        }
        if let Some(path) = &self.image {
            spec.image_source = Some(ImageSource::File(path.clone()));
        }
        if let Some(color) = self.text_color {
            spec.text_color = color;
        }
        if let Some(family) = &self.font_family {
            spec.font_family = family.clone();
        }
        if let Some(offset) = self.wrap_offset {
            spec.wrap_offset = offset;
        }
        Ok(spec)
    }
}

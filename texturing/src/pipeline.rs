//! Design → texture pipeline with asynchronous image decoding.
//!
//! Every [`DesignPipeline::submit`] gets a new [`RequestId`]. Image decodes
//! run on the pipeline's [`TaskRunner`]; when one completes, its result is
//! composed only if it still belongs to the latest request. Older decodes
//! finishing late are dropped, so the installed texture always reflects the
//! last submitted design.

use std::sync::Arc;

use mugprint_core::compute::{TaskHandle, TaskPoll, TaskRunner};
use mugprint_core::scene::Scene;

use crate::binder::apply_texture;
use crate::compositor::{CompositedTexture, Compositor};
use crate::config::{BinderConfig, CompositorConfig};
use crate::decode::{DecodedImage, decode_image};
use crate::design::DesignSpec;
use crate::error::DecodeError;

/// Monotonic identifier of a submitted design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl RequestId {
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Receives composited textures from a [`DesignPipeline`].
///
/// `install` for the new texture is always called before `release` for the
/// one it replaces.
pub trait TextureSink {
    fn install(&mut self, texture: &Arc<CompositedTexture>);
    fn release(&mut self, texture: Arc<CompositedTexture>);
}

struct PendingDecode {
    request: RequestId,
    spec: DesignSpec,
    handle: TaskHandle<Result<DecodedImage, DecodeError>>,
}

/// Owns the compositor and feeds its output into a [`TextureSink`].
pub struct DesignPipeline<R: TaskRunner, S: TextureSink> {
    compositor: Compositor,
    runner: R,
    sink: S,
    next_request: u64,
    latest: Option<RequestId>,
    installed: Option<RequestId>,
    current: Option<Arc<CompositedTexture>>,
    pending: Vec<PendingDecode>,
}

impl<R: TaskRunner, S: TextureSink> DesignPipeline<R, S> {
    pub fn new(config: CompositorConfig, runner: R, sink: S) -> Self {
        Self::with_compositor(Compositor::new(config), runner, sink)
    }

    pub fn with_compositor(compositor: Compositor, runner: R, sink: S) -> Self {
        Self {
            compositor,
            runner,
            sink,
            next_request: 1,
            latest: None,
            installed: None,
            current: None,
            pending: Vec::new(),
        }
    }

    /// Submit a new design. Designs without an image are composed and
    /// installed immediately; others start an image decode.
    pub fn submit(&mut self, spec: DesignSpec) -> RequestId {
        let request = RequestId(self.next_request);
        self.next_request += 1;
        self.latest = Some(request);

        match spec.image_source.clone() {
            None => {
                log::debug!("Request {:?}: no image, composing now", request);
                let texture = self.compositor.compose_with(&spec, None);
                self.install(request, texture);
            }
            Some(source) => {
                log::debug!("Request {:?}: decoding image", request);
                let handle = self.runner.run(move || decode_image(&source));
                self.pending.push(PendingDecode {
                    request,
                    spec,
                    handle,
                });
            }
        }
        request
    }

    /// Drain finished decodes without blocking.
    ///
    /// Returns the request whose texture got installed, if any.
    pub fn poll(&mut self) -> Option<RequestId> {
        let mut installed = None;
        for decode in std::mem::take(&mut self.pending) {
            match decode.handle.poll_result() {
                TaskPoll::Pending => self.pending.push(decode),
                TaskPoll::Ready(result) => {
                    if self.finish(decode.request, &decode.spec, Some(result)) {
                        installed = Some(decode.request);
                    }
                }
                TaskPoll::Lost => {
                    if self.finish(decode.request, &decode.spec, None) {
                        installed = Some(decode.request);
                    }
                }
            }
        }
        installed
    }

    /// Block until the latest request's decode finishes and install it.
    /// Decodes of older requests are dropped without waiting for them.
    ///
    /// Returns `None` when the latest request is not waiting on a decode.
    pub fn wait_latest(&mut self) -> Option<RequestId> {
        let latest = self.latest?;
        let before = self.pending.len();
        self.pending.retain(|d| d.request == latest);
        if self.pending.len() < before {
            log::debug!("Dropped {} stale decode(s)", before - self.pending.len());
        }
        let decode = self.pending.pop()?;
        let result = decode.handle.recv();
        self.finish(decode.request, &decode.spec, result)
            .then_some(decode.request)
    }

    /// Compose a finished decode if it belongs to the latest request.
    /// `None` means the decode job vanished without a result.
    fn finish(
        &mut self,
        request: RequestId,
        spec: &DesignSpec,
        result: Option<Result<DecodedImage, DecodeError>>,
    ) -> bool {
        if self.latest != Some(request) {
            log::debug!(
                "Discarding stale decode for {:?} (latest {:?})",
                request,
                self.latest
            );
            return false;
        }

        let image = match result {
            Some(Ok(image)) => Some(image),
            Some(Err(e)) => {
                log::warn!("Image layer omitted: {}", e);
                None
            }
            None => {
                log::warn!("Image layer omitted: decode task for {:?} was lost", request);
                None
            }
        };
        let texture = self.compositor.compose_with(spec, image.as_ref());
        self.install(request, texture);
        true
    }

    fn install(&mut self, request: RequestId, texture: CompositedTexture) {
        let texture = Arc::new(texture);
        self.sink.install(&texture);
        if let Some(previous) = self.current.replace(texture) {
            self.sink.release(previous);
        }
        self.installed = Some(request);
    }

    /// The installed texture.
    pub fn current(&self) -> Option<&Arc<CompositedTexture>> {
        self.current.as_ref()
    }

    pub fn latest_request(&self) -> Option<RequestId> {
        self.latest
    }

    pub fn installed_request(&self) -> Option<RequestId> {
        self.installed
    }

    /// Decodes not yet observed as finished.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// True once the latest request's texture is installed.
    pub fn is_settled(&self) -> bool {
        self.latest.is_some() && self.latest == self.installed
    }

    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    pub fn compositor_mut(&mut self) -> &mut Compositor {
        &mut self.compositor
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}

/// A [`TextureSink`] that keeps a textured copy of a mug scene.
#[derive(Debug, Clone)]
pub struct SceneSink {
    source: Scene,
    config: BinderConfig,
    textured: Scene,
    current: Option<Arc<CompositedTexture>>,
}

impl SceneSink {
    pub fn new(source: Scene, config: BinderConfig) -> Self {
        let textured = source.clone();
        Self {
            source,
            config,
            textured,
            current: None,
        }
    }

    /// The scene with the current design bound.
    pub fn scene(&self) -> &Scene {
        &self.textured
    }

    /// The untouched scene designs are bound onto.
    pub fn source(&self) -> &Scene {
        &self.source
    }

    /// Swap the mug model, rebinding the current design.
    pub fn set_source(&mut self, source: Scene) {
        self.source = source;
        self.rebind();
    }

    fn rebind(&mut self) {
        self.textured = apply_texture(Some(&self.source), self.current.as_deref(), &self.config);
    }
}

impl TextureSink for SceneSink {
    fn install(&mut self, texture: &Arc<CompositedTexture>) {
        self.current = Some(Arc::clone(texture));
        self.rebind();
    }

    fn release(&mut self, texture: Arc<CompositedTexture>) {
        log::debug!("Releasing texture {:?}", texture.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::TextureId;
    use crate::config::CanvasConfig;
    use crate::design::ImageSource;
    use crate::text::tests::BlockRasterizer;
    use image::{ImageFormat, RgbaImage};
    use mugprint_core::compute::{InlineRunner, ThreadRunner};
    use mugprint_core::material::{CpuMaterial, MaterialSemantic};
    use mugprint_core::mesh::generators::generate_cylinder;
    use mugprint_core::scene::SceneNode;
    use std::io::Cursor;
    use std::sync::{Mutex, mpsc};

    const RED: [u8; 4] = [255, 0, 0, 255];
    const BLUE: [u8; 4] = [0, 0, 255, 255];
    const WHITE: [u8; 4] = [255, 255, 255, 255];

    type Job = Box<dyn FnOnce() + Send>;

    /// Runner whose jobs only run when the test says so.
    #[derive(Clone, Default)]
    struct ManualRunner {
        jobs: Arc<Mutex<Vec<Option<Job>>>>,
    }

    impl ManualRunner {
        fn complete(&self, index: usize) {
            let job = self.jobs.lock().unwrap()[index].take();
            if let Some(job) = job {
                job();
            }
        }

        fn drop_job(&self, index: usize) {
            self.jobs.lock().unwrap()[index] = None;
        }
    }

    impl TaskRunner for ManualRunner {
        fn run<T, F>(&self, job: F) -> TaskHandle<T>
        where
            T: Send + 'static,
            F: FnOnce() -> T + Send + 'static,
        {
            let (tx, rx) = mpsc::channel();
            self.jobs.lock().unwrap().push(Some(Box::new(move || {
                let _ = tx.send(job());
            })));
            TaskHandle::new(rx)
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Event {
        Install(TextureId),
        Release(TextureId),
    }

    #[derive(Default)]
    struct RecordingSink {
        events: Vec<Event>,
    }

    impl TextureSink for RecordingSink {
        fn install(&mut self, texture: &Arc<CompositedTexture>) {
            self.events.push(Event::Install(texture.id));
        }

        fn release(&mut self, texture: Arc<CompositedTexture>) {
            self.events.push(Event::Release(texture.id));
        }
    }

    fn compositor() -> Compositor {
        Compositor::with_rasterizer(
            CompositorConfig {
                canvas: CanvasConfig {
                    width: 16,
                    height: 8,
                },
                ..Default::default()
            },
            BlockRasterizer,
        )
    }

    fn png(rgba: [u8; 4]) -> ImageSource {
        let img = RgbaImage::from_pixel(4, 4, image::Rgba(rgba));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        ImageSource::Bytes(out.into_inner().into())
    }

    fn center(texture: &CompositedTexture) -> [u8; 4] {
        texture.texture.pixel(8, 4).unwrap()
    }

    fn pipeline<R: TaskRunner>(runner: R) -> DesignPipeline<R, RecordingSink> {
        DesignPipeline::with_compositor(compositor(), runner, RecordingSink::default())
    }

    #[test]
    fn design_without_image_installs_immediately() {
        let mut p = pipeline(ManualRunner::default());
        let id = p.submit(DesignSpec::new().with_text("Hi"));
        assert_eq!(p.installed_request(), Some(id));
        assert!(p.is_settled());
        assert_eq!(p.pending_count(), 0);
        assert_eq!(p.sink().events.len(), 1);
    }

    #[test]
    fn install_happens_before_release() {
        let mut p = pipeline(InlineRunner);
        p.submit(DesignSpec::new());
        let first = p.current().unwrap().id;
        p.submit(DesignSpec::new().with_text("A"));
        let second = p.current().unwrap().id;

        assert_eq!(
            p.sink().events,
            vec![
                Event::Install(first),
                Event::Install(second),
                Event::Release(first)
            ]
        );
    }

    #[test]
    fn request_ids_increase() {
        let mut p = pipeline(InlineRunner);
        let a = p.submit(DesignSpec::new());
        let b = p.submit(DesignSpec::new());
        assert!(b > a);
        assert_eq!(b.get(), a.get() + 1);
        assert_eq!(p.latest_request(), Some(b));
    }

    #[test]
    fn inline_decode_installs_on_poll() {
        let mut p = pipeline(InlineRunner);
        let id = p.submit(DesignSpec::new().with_image(png(RED)));
        assert_eq!(p.installed_request(), None);
        assert_eq!(p.poll(), Some(id));
        assert_eq!(center(p.current().unwrap()), RED);
    }

    #[test]
    fn stale_decode_finishing_last_is_discarded() {
        let runner = ManualRunner::default();
        let mut p = pipeline(runner.clone());
        p.submit(DesignSpec::new().with_image(png(RED)));
        let b = p.submit(DesignSpec::new().with_image(png(BLUE)));

        runner.complete(1);
        assert_eq!(p.poll(), Some(b));
        runner.complete(0);
        assert_eq!(p.poll(), None);

        assert_eq!(p.installed_request(), Some(b));
        assert_eq!(center(p.current().unwrap()), BLUE);
        assert_eq!(p.sink().events.len(), 1);
        assert_eq!(p.pending_count(), 0);
    }

    #[test]
    fn stale_decode_finishing_first_is_discarded() {
        let runner = ManualRunner::default();
        let mut p = pipeline(runner.clone());
        p.submit(DesignSpec::new().with_image(png(RED)));
        let b = p.submit(DesignSpec::new().with_image(png(BLUE)));

        runner.complete(0);
        assert_eq!(p.poll(), None);
        assert!(p.current().is_none());

        runner.complete(1);
        assert_eq!(p.poll(), Some(b));
        assert_eq!(center(p.current().unwrap()), BLUE);
    }

    #[test]
    fn newer_design_without_image_supersedes_pending_decode() {
        let runner = ManualRunner::default();
        let mut p = pipeline(runner.clone());
        p.submit(DesignSpec::new().with_image(png(RED)));
        let b = p.submit(DesignSpec::new());
        runner.complete(0);
        assert_eq!(p.poll(), None);
        assert_eq!(p.installed_request(), Some(b));
        assert_eq!(center(p.current().unwrap()), WHITE);
    }

    #[test]
    fn failed_decode_composes_without_image() {
        let mut p = pipeline(InlineRunner);
        let id = p.submit(
            DesignSpec::new().with_image(ImageSource::DataUrl("data:image/png,nope".into())),
        );
        assert_eq!(p.poll(), Some(id));
        assert_eq!(center(p.current().unwrap()), WHITE);
    }

    #[test]
    fn lost_decode_composes_without_image() {
        let runner = ManualRunner::default();
        let mut p = pipeline(runner.clone());
        let id = p.submit(DesignSpec::new().with_image(png(RED)));
        assert_eq!(p.poll(), None);
        runner.drop_job(0);
        assert_eq!(p.poll(), Some(id));
        assert_eq!(center(p.current().unwrap()), WHITE);
    }

    #[test]
    fn wait_latest_blocks_on_worker_thread() {
        let mut p = pipeline(ThreadRunner);
        let id = p.submit(DesignSpec::new().with_image(png(BLUE)));
        assert_eq!(p.wait_latest(), Some(id));
        assert_eq!(center(p.current().unwrap()), BLUE);
        assert_eq!(p.wait_latest(), None);
    }

    #[test]
    fn wait_latest_drops_unfinished_stale_decodes() {
        let runner = ManualRunner::default();
        let mut p = pipeline(runner.clone());
        p.submit(DesignSpec::new().with_image(png(RED)));
        let b = p.submit(DesignSpec::new().with_image(png(BLUE)));
        assert_eq!(p.pending_count(), 2);

        runner.complete(1);
        assert_eq!(p.wait_latest(), Some(b));
        assert_eq!(p.pending_count(), 0);
        assert!(p.is_settled());

        runner.complete(0);
        assert_eq!(p.poll(), None);
        assert_eq!(center(p.current().unwrap()), BLUE);
    }

    #[test]
    fn scene_sink_binds_each_installed_texture() {
        let mat = Arc::new(CpuMaterial::new().with_name("Caneca-corpo"));
        let scene = Scene::new()
            .with_nodes(vec![SceneNode::new().with_name("Mug").with_meshes(vec![0])])
            .with_meshes(vec![generate_cylinder(1.0, 1.0, 8).with_material(mat)]);
        let sink = SceneSink::new(scene, BinderConfig::default());
        let mut p = DesignPipeline::with_compositor(compositor(), InlineRunner, sink);

        p.submit(DesignSpec::new());
        p.submit(DesignSpec::new().with_text("B"));

        let textured = p.sink().scene();
        let node = textured.find_node("Mug").unwrap();
        let mesh = textured.node_meshes(node).next().unwrap();
        let tex = mesh
            .material()
            .unwrap()
            .get_texture(&MaterialSemantic::BaseColorTexture)
            .unwrap();
        assert_eq!(*tex, p.current().unwrap().texture_ref());
        // Rebinding starts from the source each time.
        assert_eq!(textured.meshes.len(), 2);
        assert_eq!(p.sink().source().meshes.len(), 1);
    }

    #[test]
    fn scene_sink_rebinds_current_design_on_new_source() {
        let mug = |node: &str, material: &str| {
            let mat = Arc::new(CpuMaterial::new().with_name(material));
            Scene::new()
                .with_nodes(vec![SceneNode::new().with_name(node).with_meshes(vec![0])])
                .with_meshes(vec![generate_cylinder(1.0, 1.0, 8).with_material(mat)])
        };
        let sink = SceneSink::new(mug("Mug", "Caneca-corpo"), BinderConfig::default());
        let mut p = DesignPipeline::with_compositor(compositor(), InlineRunner, sink);
        p.submit(DesignSpec::new().with_text("A"));
        let expected = p.current().unwrap().texture_ref();

        p.sink_mut().set_source(mug("Cup", "Body"));

        assert_eq!(p.sink().source().nodes[0].name.as_deref(), Some("Cup"));
        let textured = p.sink().scene();
        assert!(textured.find_node("Mug").is_none());
        let node = textured.find_node("Cup").unwrap();
        let mesh = textured.node_meshes(node).next().unwrap();
        let material = mesh.material().unwrap();
        assert_eq!(material.name.as_deref(), Some("Body"));
        let tex = material
            .get_texture(&MaterialSemantic::BaseColorTexture)
            .unwrap();
        assert_eq!(*tex, expected);
    }
}

//! Split export of tall cards
//!
//! The segmenter owns the rendered card for the duration of one export.
//! For every slice it shifts the card up by the slice offset, clips the
//! visible window to the slice height, asks the rasterizer for an image of
//! that window and hands the image to a sink as `{stem}-part-{n}.{ext}`.
//!
//! The card's original visual state is restored on every exit path,
//! including capture failures, panics and a dropped export future.

use std::future::Future;
use std::time::Duration;

use crate::config::ExportConfig;
use crate::error::{ExportError, ExportResult, RasterizeError};
use crate::export::filter::{ExcludeTags, NodeFilter};
use crate::export::plan::{needs_split, scale_factor, Slice, SlicePlan};
use crate::export::sink::{ImageSink, RasterImage};
use crate::text::title::part_file_name;

/// Transient presentation overrides applied to the card during capture
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VisualState {
    /// Vertical translation in rendered pixels (negative moves content up)
    pub translate_y: f64,
    /// Fixed viewport height, `None` for natural height
    pub height: Option<f64>,
    /// Hide content outside the viewport
    pub clip_overflow: bool,
}

impl VisualState {
    /// Window onto one slice of the card
    pub fn for_slice(slice: &Slice) -> Self {
        Self {
            translate_y: -(slice.offset as f64),
            height: Some(slice.height as f64),
            clip_overflow: true,
        }
    }
}

/// The rendered card being exported
pub trait Artifact {
    /// Current laid-out width in rendered pixels
    fn rendered_width(&self) -> f64;

    /// Full content height in rendered pixels
    fn rendered_height(&self) -> f64;

    fn visual_state(&self) -> VisualState;

    fn apply_visual_state(&mut self, state: &VisualState);
}

/// What the rasterizer should capture for one slice
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliceRequest {
    pub slice: Slice,
    /// Number of slices in this export
    pub total: usize,
    /// Uniform output scale, `target_width / rendered_width`
    pub scale: f64,
    pub target_width: u32,
}

impl SliceRequest {
    /// Expected output height of this slice in pixels
    pub fn output_height(&self) -> u32 {
        (self.slice.height as f64 * self.scale).round() as u32
    }
}

/// External capture routine that turns the visible card window into an image
#[allow(async_fn_in_trait)]
pub trait Rasterizer<A: Artifact + ?Sized> {
    async fn rasterize(
        &mut self,
        artifact: &A,
        request: &SliceRequest,
        filter: &dyn NodeFilter,
    ) -> Result<RasterImage, RasterizeError>;
}

/// Adapts a plain `on_slice` callback that only needs the slice geometry
pub struct OnSlice<F>(pub F);

impl<A, F, Fut> Rasterizer<A> for OnSlice<F>
where
    A: Artifact + ?Sized,
    F: FnMut(SliceRequest) -> Fut,
    Fut: Future<Output = Result<RasterImage, RasterizeError>>,
{
    async fn rasterize(
        &mut self,
        _artifact: &A,
        request: &SliceRequest,
        _filter: &dyn NodeFilter,
    ) -> Result<RasterImage, RasterizeError> {
        (self.0)(*request).await
    }
}

/// Scoped override of an artifact's visual state.
///
/// Captures the state on acquisition and writes it back on drop.
pub struct StateGuard<'a, A: Artifact + ?Sized> {
    artifact: &'a mut A,
    original: VisualState,
}

impl<'a, A: Artifact + ?Sized> StateGuard<'a, A> {
    pub fn acquire(artifact: &'a mut A) -> Self {
        let original = artifact.visual_state();
        Self { artifact, original }
    }

    pub fn apply(&mut self, state: &VisualState) {
        self.artifact.apply_visual_state(state);
    }

    pub fn artifact(&self) -> &A {
        &*self.artifact
    }

    pub fn original(&self) -> &VisualState {
        &self.original
    }
}

impl<A: Artifact + ?Sized> Drop for StateGuard<'_, A> {
    fn drop(&mut self) {
        self.artifact.apply_visual_state(&self.original);
        log::debug!("Restored card visual state");
    }
}

/// Outcome of a finished export
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSummary {
    /// File names in part order
    pub files: Vec<String>,
    pub scale: f64,
}

/// Drives the capture loop for split and whole-card exports
pub struct Segmenter {
    target_width: u32,
    max_slice_height: u32,
    split_threshold: u32,
    pixel_ratio: f64,
    delay: Duration,
    extension: String,
    filter: Box<dyn NodeFilter + Send + Sync>,
}

impl Segmenter {
    pub fn new(config: &ExportConfig) -> Self {
        Self {
            target_width: config.target_width,
            max_slice_height: config.max_slice_height,
            split_threshold: config.split_threshold,
            pixel_ratio: config.pixel_ratio,
            delay: config.inter_capture_delay(),
            extension: config.image_extension.clone(),
            filter: Box::new(ExcludeTags::default()),
        }
    }

    /// Replace the default node filter
    pub fn with_filter(mut self, filter: impl NodeFilter + Send + Sync + 'static) -> Self {
        self.filter = Box::new(filter);
        self
    }

    /// Whether the caller should offer a split export for this card
    pub fn should_offer_split<A: Artifact + ?Sized>(&self, artifact: &A) -> bool {
        needs_split(artifact.rendered_height(), self.split_threshold)
    }

    /// Slice plan for the card at its current size
    pub fn plan<A: Artifact + ?Sized>(&self, artifact: &A) -> ExportResult<SlicePlan> {
        SlicePlan::for_measured(artifact.rendered_height(), self.max_slice_height)
    }

    /// Export the card as consecutive slices.
    ///
    /// Slices are captured strictly in order. The first failing slice ends
    /// the export with [`ExportError::SliceCapture`]; parts emitted before it
    /// stay emitted.
    pub async fn export_slices<A, R, S>(
        &self,
        artifact: &mut A,
        stem: &str,
        rasterizer: &mut R,
        sink: &mut S,
    ) -> ExportResult<ExportSummary>
    where
        A: Artifact + ?Sized,
        R: Rasterizer<A>,
        S: ImageSink,
    {
        let scale = scale_factor(self.target_width, artifact.rendered_width())?;
        let plan = self.plan(artifact)?;
        let total = plan.len();

        log::info!(
            "Exporting {} px card as {} part(s) at scale {:.3}",
            plan.total_height(),
            total,
            scale
        );

        let mut guard = StateGuard::acquire(artifact);
        let mut files = Vec::with_capacity(total);

        for slice in plan.slices() {
            guard.apply(&VisualState::for_slice(&slice));

            let request = SliceRequest {
                slice,
                total,
                scale,
                target_width: self.target_width,
            };
            log::debug!(
                "Capturing part {}/{} (offset {}, height {})",
                slice.part(),
                total,
                slice.offset,
                slice.height
            );

            let capture_failed = |source: RasterizeError| ExportError::SliceCapture {
                part: slice.part(),
                total,
                source,
            };

            let image = rasterizer
                .rasterize(guard.artifact(), &request, self.filter.as_ref())
                .await
                .map_err(capture_failed)?;
            if image.data.is_empty() {
                return Err(capture_failed(RasterizeError::EmptyImage));
            }

            let name = part_file_name(stem, slice.part(), &self.extension);
            sink.emit(&name, &image)
                .await
                .map_err(|e| capture_failed(RasterizeError::Emit(e)))?;
            files.push(name);

            if slice.part() < total {
                tokio::time::sleep(self.delay).await;
            }
        }

        drop(guard);
        log::info!("Exported {} part(s)", files.len());
        Ok(ExportSummary { files, scale })
    }

    /// Export the whole card as a single image at the configured pixel ratio
    pub async fn export_whole<A, R, S>(
        &self,
        artifact: &mut A,
        stem: &str,
        rasterizer: &mut R,
        sink: &mut S,
    ) -> ExportResult<ExportSummary>
    where
        A: Artifact + ?Sized,
        R: Rasterizer<A>,
        S: ImageSink,
    {
        let width = artifact.rendered_width();
        // validates the height before any mutation
        let plan = SlicePlan::for_measured(artifact.rendered_height(), u32::MAX)?;
        if !width.is_finite() || width <= 0.0 {
            return Err(ExportError::InvalidDimension {
                name: "rendered_width",
                value: width,
            });
        }

        let mut guard = StateGuard::acquire(artifact);
        guard.apply(&VisualState::default());

        let request = SliceRequest {
            slice: Slice {
                index: 0,
                offset: 0,
                height: plan.total_height(),
            },
            total: 1,
            scale: self.pixel_ratio,
            target_width: (width * self.pixel_ratio).round() as u32,
        };

        let capture_failed = |source: RasterizeError| ExportError::SliceCapture {
            part: 1,
            total: 1,
            source,
        };

        let image = rasterizer
            .rasterize(guard.artifact(), &request, self.filter.as_ref())
            .await
            .map_err(capture_failed)?;
        if image.data.is_empty() {
            return Err(capture_failed(RasterizeError::EmptyImage));
        }

        let name = format!("{}.{}", stem, self.extension);
        sink.emit(&name, &image)
            .await
            .map_err(|e| capture_failed(RasterizeError::Emit(e)))?;

        Ok(ExportSummary {
            files: vec![name],
            scale: self.pixel_ratio,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::sink::MemorySink;

    #[derive(Debug)]
    struct FakeCard {
        width: f64,
        height: f64,
        state: VisualState,
        applied: Vec<VisualState>,
    }

    impl FakeCard {
        fn new(width: f64, height: f64) -> Self {
            Self {
                width,
                height,
                state: VisualState {
                    translate_y: 0.0,
                    height: None,
                    clip_overflow: false,
                },
                applied: Vec::new(),
            }
        }
    }

    impl Artifact for FakeCard {
        fn rendered_width(&self) -> f64 {
            self.width
        }

        fn rendered_height(&self) -> f64 {
            self.height
        }

        fn visual_state(&self) -> VisualState {
            self.state.clone()
        }

        fn apply_visual_state(&mut self, state: &VisualState) {
            self.state = state.clone();
            self.applied.push(state.clone());
        }
    }

    /// Records what it saw; fails on the given 1-indexed part
    #[derive(Default)]
    struct FakeRasterizer {
        fail_on_part: Option<usize>,
        seen: Vec<(SliceRequest, VisualState)>,
    }

    impl Rasterizer<FakeCard> for FakeRasterizer {
        async fn rasterize(
            &mut self,
            artifact: &FakeCard,
            request: &SliceRequest,
            filter: &dyn NodeFilter,
        ) -> Result<RasterImage, RasterizeError> {
            assert!(!filter.should_include("SCRIPT"));
            self.seen.push((*request, artifact.state.clone()));
            if self.fail_on_part == Some(request.slice.part()) {
                return Err(RasterizeError::Capture("canvas too large".to_string()));
            }
            Ok(RasterImage {
                data: vec![request.slice.index as u8 + 1],
                width: request.target_width,
                height: request.output_height(),
            })
        }
    }

    fn segmenter() -> Segmenter {
        let config = ExportConfig {
            inter_capture_delay_ms: 0,
            ..ExportConfig::default()
        };
        Segmenter::new(&config)
    }

    #[tokio::test]
    async fn test_exports_parts_in_order() {
        let mut card = FakeCard::new(540.0, 17000.0);
        let mut rasterizer = FakeRasterizer::default();
        let mut sink = MemorySink::default();

        let summary = segmenter()
            .export_slices(&mut card, "Card_240307", &mut rasterizer, &mut sink)
            .await
            .unwrap();

        assert_eq!(
            summary.files,
            vec![
                "Card_240307-part-1.png",
                "Card_240307-part-2.png",
                "Card_240307-part-3.png"
            ]
        );
        assert_eq!(summary.scale, 2.0);

        let offsets: Vec<_> = rasterizer
            .seen
            .iter()
            .map(|(r, s)| (r.slice.offset, r.slice.height, s.translate_y, s.height))
            .collect();
        assert_eq!(
            offsets,
            vec![
                (0, 8000, 0.0, Some(8000.0)),
                (8000, 8000, -8000.0, Some(8000.0)),
                (16000, 1000, -16000.0, Some(1000.0)),
            ]
        );
        assert!(rasterizer.seen.iter().all(|(r, _)| r.scale == 2.0 && r.total == 3));
        assert_eq!(rasterizer.seen[2].0.output_height(), 2000);
    }

    #[tokio::test]
    async fn test_state_restored_after_success() {
        let mut card = FakeCard::new(540.0, 9000.0);
        let original = card.state.clone();

        segmenter()
            .export_slices(&mut card, "c", &mut FakeRasterizer::default(), &mut MemorySink::default())
            .await
            .unwrap();

        assert_eq!(card.state, original);
        assert!(card.applied.iter().any(|s| s.clip_overflow));
    }

    #[tokio::test]
    async fn test_failure_mid_sequence_stops_and_restores() {
        let mut card = FakeCard::new(540.0, 24000.0);
        let original = card.state.clone();
        let mut rasterizer = FakeRasterizer {
            fail_on_part: Some(3),
            ..Default::default()
        };
        let mut sink = MemorySink::default();

        let err = segmenter()
            .export_slices(&mut card, "c", &mut rasterizer, &mut sink)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ExportError::SliceCapture {
                part: 3,
                total: 3,
                source: RasterizeError::Capture(_)
            }
        ));
        let emitted: Vec<_> = sink.images.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(emitted, vec!["c-part-1.png", "c-part-2.png"]);
        assert_eq!(card.state, original);
    }

    #[tokio::test]
    async fn test_failure_on_second_part_attempts_nothing_after() {
        let mut card = FakeCard::new(540.0, 24000.0);
        let mut rasterizer = FakeRasterizer {
            fail_on_part: Some(2),
            ..Default::default()
        };
        let mut sink = MemorySink::default();

        let result = segmenter()
            .export_slices(&mut card, "c", &mut rasterizer, &mut sink)
            .await;

        assert!(matches!(result, Err(ExportError::SliceCapture { part: 2, .. })));
        assert_eq!(rasterizer.seen.len(), 2);
        assert_eq!(sink.images.len(), 1);
        assert_eq!(card.state.translate_y, 0.0);
        assert_eq!(card.state.height, None);
    }

    #[tokio::test]
    async fn test_invalid_dimensions_fail_before_mutation() {
        let mut card = FakeCard::new(540.0, 0.0);
        let result = segmenter()
            .export_slices(&mut card, "c", &mut FakeRasterizer::default(), &mut MemorySink::default())
            .await;
        assert!(matches!(
            result,
            Err(ExportError::InvalidDimension { name: "total_height", .. })
        ));
        assert!(card.applied.is_empty());

        let mut narrow = FakeCard::new(0.0, 9000.0);
        let result = segmenter()
            .export_slices(&mut narrow, "c", &mut FakeRasterizer::default(), &mut MemorySink::default())
            .await;
        assert!(matches!(
            result,
            Err(ExportError::InvalidDimension { name: "rendered_width", .. })
        ));
        assert!(narrow.applied.is_empty());
    }

    #[tokio::test]
    async fn test_inter_capture_delay_between_parts() {
        let config = ExportConfig {
            inter_capture_delay_ms: 20,
            ..ExportConfig::default()
        };
        let mut card = FakeCard::new(540.0, 24000.0);
        let started = std::time::Instant::now();

        Segmenter::new(&config)
            .export_slices(&mut card, "c", &mut FakeRasterizer::default(), &mut MemorySink::default())
            .await
            .unwrap();

        assert!(started.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn test_export_whole_uses_pixel_ratio() {
        let mut card = FakeCard::new(400.0, 3000.0);
        let mut rasterizer = FakeRasterizer::default();
        let mut sink = MemorySink::default();

        let summary = segmenter()
            .export_whole(&mut card, "Card_240307", &mut rasterizer, &mut sink)
            .await
            .unwrap();

        assert_eq!(summary.files, vec!["Card_240307.png"]);
        let request = rasterizer.seen[0].0;
        assert_eq!(request.target_width, 800);
        assert_eq!(request.slice.height, 3000);
        assert!(!card.state.clip_overflow);
    }

    #[tokio::test]
    async fn test_on_slice_callback() {
        let mut card = FakeCard::new(1080.0, 20000.0);
        let mut calls = Vec::new();
        let mut sink = MemorySink::default();

        let result = segmenter()
            .export_slices(
                &mut card,
                "c",
                &mut OnSlice(|request: SliceRequest| {
                    calls.push((request.slice.index, request.slice.offset, request.slice.height));
                    async move {
                        if request.slice.index == 1 {
                            return Err(RasterizeError::Capture("network image blocked".to_string()));
                        }
                        Ok::<_, RasterizeError>(RasterImage {
                            data: vec![0xff],
                            width: request.target_width,
                            height: request.output_height(),
                        })
                    }
                }),
                &mut sink,
            )
            .await;

        assert!(matches!(result, Err(ExportError::SliceCapture { part: 2, total: 3, .. })));
        assert_eq!(calls, vec![(0, 0, 8000), (1, 8000, 8000)]);
        assert_eq!(sink.images.len(), 1);
    }

    #[test]
    fn test_should_offer_split() {
        let seg = segmenter();
        assert!(!seg.should_offer_split(&FakeCard::new(540.0, 9000.0)));
        assert!(seg.should_offer_split(&FakeCard::new(540.0, 12000.0)));
    }

    #[test]
    fn test_guard_restores_on_panic() {
        let mut card = FakeCard::new(540.0, 9000.0);
        let original = card.state.clone();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut guard = StateGuard::acquire(&mut card);
            guard.apply(&VisualState {
                translate_y: -500.0,
                height: Some(10.0),
                clip_overflow: true,
            });
            panic!("capture blew up");
        }));

        assert!(result.is_err());
        assert_eq!(card.state, original);
    }

    /// Never finishes a capture
    struct StalledRasterizer;

    impl Rasterizer<FakeCard> for StalledRasterizer {
        async fn rasterize(
            &mut self,
            _artifact: &FakeCard,
            _request: &SliceRequest,
            _filter: &dyn NodeFilter,
        ) -> Result<RasterImage, RasterizeError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_state_restored_when_export_is_dropped() {
        let mut card = FakeCard::new(540.0, 17000.0);
        let original = card.state.clone();
        let seg = segmenter();
        let mut sink = MemorySink::default();

        let result = tokio::time::timeout(
            Duration::from_millis(20),
            seg.export_slices(&mut card, "c", &mut StalledRasterizer, &mut sink),
        )
        .await;

        assert!(result.is_err());
        assert!(sink.images.is_empty());
        let first_window = VisualState::for_slice(&Slice {
            index: 0,
            offset: 0,
            height: 8000,
        });
        assert_eq!(card.applied.first(), Some(&first_window));
        assert_eq!(card.applied.last(), Some(&original));
        assert_eq!(card.state, original);
    }
}

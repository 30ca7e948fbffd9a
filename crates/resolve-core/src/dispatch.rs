//! CPU dispatch: run the stage once per fragment and scatter the results into
//! two output buffers.

use std::num::NonZeroUsize;
use std::thread;

use glam::Vec3;

use crate::{FragmentInput, ImageSource, OutputSlot, ResolveStage, ResolvedFragment};

/// The two output buffers. Index `i` in either buffer belongs to input `i`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FragmentTargets {
    /// Slot 0.
    pub color: Vec<Vec3>,
    /// Slot 1.
    pub coord: Vec<Vec3>,
}

impl FragmentTargets {
    pub fn zeroed(len: usize) -> Self {
        Self {
            color: vec![Vec3::ZERO; len],
            coord: vec![Vec3::ZERO; len],
        }
    }

    pub fn len(&self) -> usize {
        self.color.len()
    }

    pub fn is_empty(&self) -> bool {
        self.color.is_empty()
    }

    pub fn slot(&self, slot: OutputSlot) -> &[Vec3] {
        match slot {
            OutputSlot::Color => &self.color,
            OutputSlot::Coord => &self.coord,
        }
    }

    pub fn get(&self, index: usize) -> Option<ResolvedFragment> {
        Some(ResolvedFragment {
            color: *self.color.get(index)?,
            coord: *self.coord.get(index)?,
        })
    }

    fn resize(&mut self, len: usize) {
        self.color.resize(len, Vec3::ZERO);
        self.coord.resize(len, Vec3::ZERO);
    }
}

/// Sequential reference dispatch.
pub fn resolve_all<I: ImageSource>(
    stage: &ResolveStage<I>,
    inputs: &[FragmentInput],
) -> FragmentTargets {
    let mut targets = FragmentTargets::default();
    resolve_into(stage, inputs, &mut targets);
    targets
}

/// Like [`resolve_all`] but reuses `targets`, resizing it to `inputs.len()`.
pub fn resolve_into<I: ImageSource>(
    stage: &ResolveStage<I>,
    inputs: &[FragmentInput],
    targets: &mut FragmentTargets,
) {
    targets.resize(inputs.len());
    write_chunk(stage, inputs, &mut targets.color, &mut targets.coord);
}

/// Split `inputs` into contiguous chunks and resolve each on its own scoped
/// thread. Workers share only `&stage`; each owns a disjoint slice of both
/// buffers. `workers == 0` uses the available parallelism.
pub fn resolve_parallel<I: ImageSource>(
    stage: &ResolveStage<I>,
    inputs: &[FragmentInput],
    workers: usize,
) -> FragmentTargets {
    let mut targets = FragmentTargets::zeroed(inputs.len());
    let workers = effective_workers(workers).min(inputs.len());
    if workers <= 1 {
        write_chunk(stage, inputs, &mut targets.color, &mut targets.coord);
        return targets;
    }

    let chunk = inputs.len().div_ceil(workers);
    log::debug!(
        "resolving {} fragment(s) on {} worker(s), {} per chunk",
        inputs.len(),
        workers,
        chunk
    );

    thread::scope(|s| {
        let outputs = targets
            .color
            .chunks_mut(chunk)
            .zip(targets.coord.chunks_mut(chunk));
        for (inputs, (color, coord)) in inputs.chunks(chunk).zip(outputs) {
            s.spawn(move || write_chunk(stage, inputs, color, coord));
        }
    });
    targets
}

fn effective_workers(requested: usize) -> usize {
    match requested {
        0 => thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1),
        n => n,
    }
}

fn write_chunk<I: ImageSource>(
    stage: &ResolveStage<I>,
    inputs: &[FragmentInput],
    color: &mut [Vec3],
    coord: &mut [Vec3],
) {
    for ((input, c), p) in inputs.iter().zip(color.iter_mut()).zip(coord.iter_mut()) {
        let out = stage.invoke(*input);
        *c = out.slot(OutputSlot::Color);
        *p = out.slot(OutputSlot::Coord);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::{SampledImage, SamplerDesc, Texture2d};
    use crate::StageBuilder;
    use glam::{Vec2, Vec4};
    use proptest::prelude::*;

    fn checker_stage() -> ResolveStage<SampledImage> {
        let tex = Texture2d::checkerboard(16, 16, 4, Vec4::new(0.1, 0.2, 0.3, 1.0), Vec4::ONE);
        StageBuilder::new()
            .image(SampledImage::new(tex, SamplerDesc::default()))
            .build()
            .expect("stage builds")
    }

    fn grid(n: usize) -> Vec<FragmentInput> {
        (0..n)
            .map(|i| {
                let t = i as f32 / n.max(1) as f32;
                FragmentInput::new(
                    Vec2::new(t, 1.0 - t),
                    Vec3::new(i as f32, -(i as f32), t),
                )
            })
            .collect()
    }

    #[test]
    fn parallel_matches_sequential() {
        let stage = checker_stage();
        let inputs = grid(1000);
        let seq = resolve_all(&stage, &inputs);
        for workers in [0, 1, 2, 3, 7, 64] {
            assert_eq!(resolve_parallel(&stage, &inputs, workers), seq, "workers={workers}");
        }
    }

    #[test]
    fn outputs_line_up_with_inputs() {
        let stage = checker_stage();
        let inputs = grid(37);
        let out = resolve_parallel(&stage, &inputs, 4);
        assert_eq!(out.len(), inputs.len());
        for (i, input) in inputs.iter().enumerate() {
            let frag = out.get(i).expect("in range");
            assert_eq!(frag, stage.invoke(*input));
            assert_eq!(out.slot(OutputSlot::Coord)[i], input.coord);
        }
    }

    #[test]
    fn empty_batch_produces_empty_targets() {
        let stage = checker_stage();
        let out = resolve_parallel(&stage, &[], 8);
        assert!(out.is_empty());
        assert!(resolve_all(&stage, &[]).is_empty());
    }

    #[test]
    fn more_workers_than_fragments() {
        let stage = checker_stage();
        let inputs = grid(3);
        assert_eq!(
            resolve_parallel(&stage, &inputs, 16),
            resolve_all(&stage, &inputs)
        );
    }

    #[test]
    fn resolve_into_resizes_reused_buffers() {
        let stage = checker_stage();
        let mut targets = FragmentTargets::zeroed(100);
        resolve_into(&stage, &grid(10), &mut targets);
        assert_eq!(targets.len(), 10);
        assert_eq!(targets.coord.len(), 10);
        resolve_into(&stage, &grid(20), &mut targets);
        assert_eq!(targets.len(), 20);
    }

    #[test]
    fn get_out_of_range_is_none() {
        assert_eq!(FragmentTargets::zeroed(2).get(2), None);
    }

    proptest! {
        #[test]
        fn order_does_not_matter(
            pairs in prop::collection::vec(
                ((-1.0f32..2.0, -1.0f32..2.0), (-1e3f32..1e3, -1e3f32..1e3, -1e3f32..1e3)),
                0..64,
            ),
            workers in 0usize..6,
        ) {
            let stage = checker_stage();
            let inputs: Vec<_> = pairs
                .iter()
                .map(|&((u, v), (x, y, z))| FragmentInput::new(Vec2::new(u, v), Vec3::new(x, y, z)))
                .collect();
            let forward = resolve_parallel(&stage, &inputs, workers);

            let reversed: Vec<_> = inputs.iter().rev().copied().collect();
            let backward = resolve_parallel(&stage, &reversed, workers);

            let n = inputs.len();
            for i in 0..n {
                prop_assert_eq!(forward.get(i), backward.get(n - 1 - i));
            }
        }
    }
}

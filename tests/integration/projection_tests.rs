//! Projection integration tests.
//!
//! Tests verify:
//! - Every reduction kind over frames read from a container
//! - Streaming reductions match batch reductions
//! - Projections along Z, Time, Channel and Tile with held indices
//! - Interleaved channel layouts and 12-bit data
//! - Out-of-range requests leave the container untouched

use lif_projector::error::{AssemblerError, ProjectionError, StackProjectionError};
use lif_projector::format::Container;
use lif_projector::io::MemoryRangeReader;
use lif_projector::pipeline::project_series;
use lif_projector::projection::{
    project, project_stack, AxisTag, ProjectionRequest, ReductionKind,
};
use lif_projector::stack::{Axis, FrameCoord, FramePlan, PixelData, SampleType};

use super::test_utils::{gradient, gradient_12bit, ImageSpec, LifBuilder};

async fn open(builder: LifBuilder) -> Container<MemoryRangeReader> {
    Container::open(MemoryRangeReader::new(builder.build(), "mem://projection.lif"))
        .await
        .unwrap()
}

fn ten_then_twenty(coord: FrameCoord, _x: u32, _y: u32) -> u16 {
    10 * (coord.z as u16 + 1)
}

fn two_hundred_then_one_hundred(coord: FrameCoord, _x: u32, _y: u32) -> u16 {
    if coord.z == 0 {
        200
    } else {
        100
    }
}

fn constant_over_z(_coord: FrameCoord, x: u32, y: u32) -> u16 {
    (x * 31 + y * 7) as u16
}

fn noisy(coord: FrameCoord, x: u32, y: u32) -> u16 {
    (((coord.z * 37 + x * 11) ^ (y * 97 + coord.t * 13)) % 4096) as u16
}

// =============================================================================
// Reduction Semantics
// =============================================================================

#[tokio::test]
async fn test_mean_of_ten_and_twenty() {
    let container = open(
        LifBuilder::new().image(ImageSpec::new("M", 3, 3).z(2).sample(ten_then_twenty)),
    )
    .await;

    let request = ProjectionRequest::new(ReductionKind::Mean);
    let (result, _) = project_series(&container, 0, &request).await.unwrap();
    assert_eq!(result.planes, vec![PixelData::U8(vec![15; 9])]);
}

#[tokio::test]
async fn test_sum_clamps() {
    let container = open(
        LifBuilder::new()
            .image(ImageSpec::new("S", 2, 2).z(2).sample(two_hundred_then_one_hundred)),
    )
    .await;

    let request = ProjectionRequest::new(ReductionKind::Sum);
    let (result, _) = project_series(&container, 0, &request).await.unwrap();
    assert_eq!(result.planes, vec![PixelData::U8(vec![255; 4])]);
    assert_eq!(result.sample_type, SampleType::U8);
}

#[tokio::test]
async fn test_std_dev_of_identical_frames() {
    let container = open(
        LifBuilder::new().image(
            ImageSpec::new("Flat", 4, 4)
                .z(5)
                .bits(12)
                .sample(constant_over_z),
        ),
    )
    .await;

    let request = ProjectionRequest::new(ReductionKind::StdDev);
    let (result, frames) = project_series(&container, 0, &request).await.unwrap();
    assert_eq!(frames, 5);
    assert_eq!(result.planes, vec![PixelData::U16(vec![0; 16])]);
}

#[tokio::test]
async fn test_max_dominates_every_frame() {
    let container =
        open(LifBuilder::new().image(ImageSpec::new("N", 6, 5).z(7).bits(12).sample(noisy))).await;

    let stack = container.frames(0, &FramePlan::along(Axis::Z)).unwrap();
    let frames = stack.collect().await.unwrap();
    let result = project_stack(&stack, ReductionKind::Max).await.unwrap();

    assert_eq!((result.width, result.height), (6, 5));
    for y in 0..5 {
        for x in 0..6 {
            let max = result.get(0, x, y).unwrap();
            let values: Vec<u16> = frames.iter().map(|f| f.get(x, y).unwrap()).collect();
            assert!(values.iter().all(|&v| v <= max));
            assert!(values.contains(&max));
        }
    }
}

#[tokio::test]
async fn test_streaming_matches_batch() {
    let container =
        open(LifBuilder::new().image(ImageSpec::new("N", 5, 4).z(6).bits(12).sample(noisy))).await;
    let stack = container.frames(0, &FramePlan::along(Axis::Z)).unwrap();
    let frames = stack.collect().await.unwrap();

    for kind in ReductionKind::ALL {
        let streamed = project_stack(&stack, kind).await.unwrap();
        let batch = project(&frames, kind).unwrap();
        assert_eq!(streamed, batch, "{}", kind);
    }
}

#[tokio::test]
async fn test_single_frame_round_trip() {
    let container =
        open(LifBuilder::new().image(ImageSpec::new("One", 4, 3).bits(12).sample(gradient_12bit)))
            .await;
    let frame = container.read_frame(0, FrameCoord::default()).await.unwrap();

    for kind in [ReductionKind::Max, ReductionKind::Mean, ReductionKind::Sum] {
        let request = ProjectionRequest::new(kind);
        let (result, _) = project_series(&container, 0, &request).await.unwrap();
        assert_eq!(result.planes, vec![frame.data.clone()], "{}", kind);
    }
}

#[tokio::test]
async fn test_none_keeps_the_stack() {
    let container = open(LifBuilder::new().image(ImageSpec::new("Z", 3, 2).z(4))).await;
    let request = ProjectionRequest::new(ReductionKind::None);
    let (result, frames) = project_series(&container, 0, &request).await.unwrap();

    assert_eq!(frames, 4);
    assert_eq!(result.axes, AxisTag::ZYX);
    assert_eq!(result.plane_count(), 4);
    for z in 0..4 {
        let coord = FrameCoord::new(z, 0, 0, 0);
        assert_eq!(result.get(z as usize, 2, 1), Some(gradient(coord, 2, 1)));
    }
}

#[tokio::test]
async fn test_empty_subset_is_an_error() {
    let container = open(LifBuilder::new().image(ImageSpec::new("Z", 2, 2).z(3))).await;
    let request = ProjectionRequest::new(ReductionKind::Max).with_indices(Vec::new());
    let stack = container.frames(0, &request.plan()).unwrap();

    let result = project_stack(&stack, request.kind).await;
    assert!(matches!(
        result,
        Err(StackProjectionError::Projection(ProjectionError::EmptyStack))
    ));
}

// =============================================================================
// Axis Selection
// =============================================================================

#[tokio::test]
async fn test_time_projection_with_held_indices() {
    let container = open(
        LifBuilder::new().image(ImageSpec::new("TL", 3, 3).z(2).t(4).channels(2).tiles(2)),
    )
    .await;

    let request = ProjectionRequest::new(ReductionKind::Max)
        .along(Axis::Time)
        .with_fixed(Axis::Z, 1)
        .with_fixed(Axis::Channel, 1)
        .with_fixed(Axis::Tile, 1);
    let (result, frames) = project_series(&container, 0, &request).await.unwrap();

    assert_eq!(frames, 4);
    let last = FrameCoord::new(1, 3, 1, 1);
    assert_eq!(result.get(0, 1, 2), Some(gradient(last, 1, 2)));
}

#[tokio::test]
async fn test_subset_along_z() {
    let container =
        open(LifBuilder::new().image(ImageSpec::new("Z", 2, 2).z(5).sample(ten_then_twenty))).await;

    // z = 0 and z = 2 hold 10 and 30
    let request = ProjectionRequest::new(ReductionKind::Mean).with_indices(vec![0, 2]);
    let (result, frames) = project_series(&container, 0, &request).await.unwrap();
    assert_eq!(frames, 2);
    assert_eq!(result.planes, vec![PixelData::U8(vec![20; 4])]);
}

#[tokio::test]
async fn test_tile_projection() {
    let container = open(LifBuilder::new().image(ImageSpec::new("Mosaic", 2, 2).tiles(4))).await;
    let request = ProjectionRequest::new(ReductionKind::Sum).along(Axis::Tile);
    let (result, frames) = project_series(&container, 0, &request).await.unwrap();

    assert_eq!(frames, 4);
    // tiles contribute 0 + 3 + 6 + 9 on top of x + y
    assert_eq!(result.get(0, 1, 1), Some(4 * 2 + 18));
}

#[tokio::test]
async fn test_interleaved_channels() {
    let container =
        open(LifBuilder::new().image(ImageSpec::new("RGB", 4, 3).channels(3).interleaved())).await;

    for channel in 0..3 {
        let frame = container
            .read_frame(0, FrameCoord::new(0, 0, channel, 0))
            .await
            .unwrap();
        for y in 0..3 {
            for x in 0..4 {
                assert_eq!(frame.get(x, y), Some(gradient(frame.coord, x, y)));
            }
        }
    }

    let request = ProjectionRequest::new(ReductionKind::Max).along(Axis::Channel);
    let (result, _) = project_series(&container, 0, &request).await.unwrap();
    let blue = FrameCoord::new(0, 0, 2, 0);
    assert_eq!(result.get(0, 3, 2), Some(gradient(blue, 3, 2)));
}

#[tokio::test]
async fn test_sixteen_bit_values_survive() {
    let container = open(
        LifBuilder::new().image(ImageSpec::new("12bit", 3, 3).z(3).bits(12).sample(gradient_12bit)),
    )
    .await;

    let request = ProjectionRequest::new(ReductionKind::Max);
    let (result, _) = project_series(&container, 0, &request).await.unwrap();
    let top = FrameCoord::new(2, 0, 0, 0);
    assert_eq!(result.sample_type, SampleType::U16);
    assert_eq!(result.get(0, 2, 2), Some(gradient_12bit(top, 2, 2)));
    assert!(result.get(0, 2, 2).unwrap() > 255);
}

// =============================================================================
// Contract Violations
// =============================================================================

#[tokio::test]
async fn test_out_of_range_index_leaves_container_untouched() {
    let container = open(LifBuilder::new().image(ImageSpec::new("Z", 2, 2).z(3).channels(2))).await;
    let before = container.list_series().to_vec();

    let request = ProjectionRequest::new(ReductionKind::Max).with_fixed(Axis::Channel, 2);
    let result = project_series(&container, 0, &request).await;
    assert!(matches!(
        result,
        Err(lif_projector::PipelineError::Assembler(
            AssemblerError::IndexOutOfRange {
                axis: Axis::Channel,
                index: 2,
                len: 2
            }
        ))
    ));

    let request = ProjectionRequest::new(ReductionKind::Max).with_indices(vec![0, 3]);
    assert!(container.frames(0, &request.plan()).is_err());

    assert_eq!(container.list_series(), &before[..]);

    // Still usable afterwards
    let request = ProjectionRequest::new(ReductionKind::Max);
    assert!(project_series(&container, 0, &request).await.is_ok());
}

#[tokio::test]
async fn test_unknown_series() {
    let container = open(LifBuilder::new().image(ImageSpec::new("Only", 2, 2))).await;
    let request = ProjectionRequest::new(ReductionKind::Max);
    let result = project_series(&container, 3, &request).await;
    assert!(matches!(
        result,
        Err(lif_projector::PipelineError::Assembler(
            AssemblerError::SeriesNotFound { index: 3, count: 1 }
        ))
    ));
}

#[tokio::test]
async fn test_unsupported_reduction_label() {
    let result = "Median".parse::<ReductionKind>();
    assert_eq!(
        result,
        Err(ProjectionError::UnsupportedReduction("Median".to_string()))
    );
}

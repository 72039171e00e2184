use crate::core::error::Result;
use crate::core::model::{ChunkLen, ChunkRange, SplitPlan};

/// Partitions `[0, file_size)` into `output_count` contiguous ranges.
///
/// Every range but the last is `chunk_size` bytes, a whole number of
/// records. The last one runs to end of file and absorbs the rounding
/// remainder plus any trailing partial record. When there are fewer
/// records than outputs, the leading ranges are empty.
pub fn plan_chunks(file_size: u64, record_width: u64, output_count: usize) -> Result<Vec<ChunkRange>> {
    let plan = SplitPlan::new(file_size, record_width, output_count)?;
    Ok(plan_ranges(&plan))
}

pub fn plan_ranges(plan: &SplitPlan) -> Vec<ChunkRange> {
    let chunk_size = plan.chunk_size();
    let last = plan.output_count - 1;

    (0..plan.output_count)
        .map(|index| ChunkRange {
            index,
            offset: chunk_size * index as u64,
            len: if index == last { ChunkLen::ToEnd } else { ChunkLen::Exact(chunk_size) },
        })
        .collect()
}

use std::ops::Range;

/// Index range of the runs handled by worker `worker_id` when `num_runs` runs
/// are split into contiguous chunks, one per worker. The first
/// `num_runs % num_workers` workers take one run more than the others, so
/// concatenating the chunks in worker order restores the input order.
pub fn get_partition_range(num_workers: usize, worker_id: usize, num_runs: usize) -> Range<usize> {
    let chunk_size = num_runs / num_workers;
    let remainder = num_runs % num_workers;

    let start = worker_id * chunk_size + worker_id.min(remainder);
    let len = chunk_size + usize::from(worker_id < remainder);

    start..start + len
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_range() {
        assert_eq!(get_partition_range(1, 0, 11), Range { start: 0, end: 11 });

        assert_eq!(get_partition_range(2, 0, 11), Range { start: 0, end: 6 });
        assert_eq!(get_partition_range(2, 1, 11), Range { start: 6, end: 11 });

        assert_eq!(get_partition_range(3, 0, 11), Range { start: 0, end: 4 });
        assert_eq!(get_partition_range(3, 1, 11), Range { start: 4, end: 8 });
        assert_eq!(get_partition_range(3, 2, 11), Range { start: 8, end: 11 });

        for i in 0..11 {
            assert_eq!(
                get_partition_range(11, i, 11),
                Range {
                    start: i,
                    end: i + 1
                }
            );
        }

        assert_eq!(get_partition_range(4, 0, 2), Range { start: 0, end: 1 });
        assert_eq!(get_partition_range(4, 1, 2), Range { start: 1, end: 2 });
        assert_eq!(get_partition_range(4, 2, 2), Range { start: 2, end: 2 });
        assert_eq!(get_partition_range(4, 3, 2), Range { start: 2, end: 2 });
    }
}

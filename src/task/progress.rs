//! Strategies for folding item progress into task progress.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::TaskItem;

/// Computes a task's progress (`0..=1`) from its items.
pub trait ProgressStrategy: Send + Sync + fmt::Debug {
    /// Returns the task progress. Must return `0.0` for an empty item list.
    fn task_progress(&self, items: &[TaskItem]) -> f64;
}

/// Arithmetic mean of item progress. Every item counts the same.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanProgress;

impl ProgressStrategy for MeanProgress {
    #[allow(clippy::cast_precision_loss)]
    fn task_progress(&self, items: &[TaskItem]) -> f64 {
        if items.is_empty() {
            return 0.0;
        }
        items.iter().map(TaskItem::progress).sum::<f64>() / items.len() as f64
    }
}

/// Weights each item by its known byte size.
///
/// Falls back to [`MeanProgress`] unless every item has a non-zero total size,
/// since a partial weighting would silently skew the result.
#[derive(Debug, Clone, Copy, Default)]
pub struct SizeWeightedProgress;

impl ProgressStrategy for SizeWeightedProgress {
    #[allow(clippy::cast_precision_loss)]
    fn task_progress(&self, items: &[TaskItem]) -> f64 {
        let sizes: Option<Vec<u64>> = items.iter().map(TaskItem::total_size).collect();
        match sizes {
            Some(sizes) if sizes.iter().sum::<u64>() > 0 => {
                let total: u64 = sizes.iter().sum();
                let done: f64 = items
                    .iter()
                    .zip(&sizes)
                    .map(|(item, &size)| item.progress() * size as f64)
                    .sum();
                done / total as f64
            }
            _ => MeanProgress.task_progress(items),
        }
    }
}

/// Config-level selector for the built-in strategies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressWeighting {
    #[default]
    Mean,
    SizeWeighted,
}

impl ProgressWeighting {
    /// Builds the strategy this setting names.
    #[must_use]
    pub fn strategy(self) -> Arc<dyn ProgressStrategy> {
        match self {
            Self::Mean => Arc::new(MeanProgress),
            Self::SizeWeighted => Arc::new(SizeWeightedProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::TaskEvent;
    use crate::task::{ItemSpec, TaskStatus};

    fn item(id: u32, size: Option<u64>, progress: f64) -> TaskItem {
        let mut spec = ItemSpec::new(format!("item {id}"));
        spec.total_size = size;
        let mut item = TaskItem::new(id, 0, spec);
        item.update(&TaskEvent::new(0, id, TaskStatus::Running, progress));
        item
    }

    #[test]
    fn mean_of_empty_is_zero() {
        assert_eq!(MeanProgress.task_progress(&[]), 0.0);
        assert_eq!(SizeWeightedProgress.task_progress(&[]), 0.0);
    }

    #[test]
    fn mean_ignores_sizes() {
        let items = [item(0, Some(10), 1.0), item(1, Some(990), 0.0)];
        assert!((MeanProgress.task_progress(&items) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn weighted_uses_sizes() {
        let items = [item(0, Some(10), 1.0), item(1, Some(990), 0.0)];
        assert!((SizeWeightedProgress.task_progress(&items) - 0.01).abs() < 1e-12);
    }

    #[test]
    fn weighted_falls_back_when_a_size_is_unknown() {
        let items = [item(0, Some(10), 1.0), item(1, None, 0.0)];
        assert!((SizeWeightedProgress.task_progress(&items) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn weighted_falls_back_when_all_sizes_are_zero() {
        let items = [item(0, Some(0), 1.0), item(1, Some(0), 0.0)];
        assert!((SizeWeightedProgress.task_progress(&items) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn weighting_parses_from_toml_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            weighting: ProgressWeighting,
        }
        let w: Wrapper = toml::from_str(r#"weighting = "size_weighted""#).unwrap();
        assert_eq!(w.weighting, ProgressWeighting::SizeWeighted);
    }
}

//! Milestone allocator: splits the grand total across the payment schedule.

use crate::coerce::finite_or_zero;
use crate::model::PaymentMilestone;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AllocationWarning {
    /// Percentages add up to more than 100.
    OverAllocated(f64),
}

/// Replaces every milestone amount with its share of `grand_total`. Order and
/// all other fields are preserved. Percentages are not range-checked.
pub fn reallocate(milestones: &[PaymentMilestone], grand_total: f64) -> Vec<PaymentMilestone> {
    milestones
        .iter()
        .map(|m| PaymentMilestone {
            amount: allocate(grand_total, m.percentage),
            ..m.clone()
        })
        .collect()
}

pub fn allocate(grand_total: f64, percentage: f64) -> f64 {
    finite_or_zero(grand_total) * finite_or_zero(percentage) / 100.0
}

pub fn total_percentage(milestones: &[PaymentMilestone]) -> f64 {
    milestones.iter().map(|m| finite_or_zero(m.percentage)).sum()
}

pub fn allocation_warning(milestones: &[PaymentMilestone]) -> Option<AllocationWarning> {
    let total = total_percentage(milestones);
    (total > 100.0).then_some(AllocationWarning::OverAllocated(total))
}

//! Picking rows out of a mixed collection and counting their data.

use crate::{DataKind, OiRow};

/// The rows of `kind`, in their original order.
pub fn filter_by_kind(rows: &[OiRow], kind: DataKind) -> Vec<&OiRow> {
    rows.iter().filter(|row| row.kind() == kind).collect()
}

/// Like [`filter_by_kind`], but get the indices into `rows` instead.
pub fn filter_indices_by_kind(rows: &[OiRow], kind: DataKind) -> Vec<usize> {
    rows.iter()
        .enumerate()
        .filter(|(_, row)| row.kind() == kind)
        .map(|(i, _)| i)
        .collect()
}

/// The total number of unmasked channels over all of the given rows.
pub fn count_active_data<'a, I>(rows: I) -> usize
where
    I: IntoIterator<Item = &'a OiRow>,
{
    rows.into_iter().map(OiRow::masked_ndata).sum()
}

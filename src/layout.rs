//! Byte-level layout of records and unions.
//!
//! Layout is computed under a *default alignment* `D` (4 or 8). A field's
//! effective alignment is `min(natural, D)`, further capped by the record's
//! `#pragma pack` value when one is in force; natural alignment is a
//! property of the field's type, the pack cap is a property of the record.
//! Trailing padding is never added: the headers' observed layout omits it,
//! and consumers must not assume `size % align == 0`.

use std::collections::{HashMap, HashSet};

use crate::model::{Parser, RecordId, UnionId};
use crate::preprocessor::Pack;
use crate::schema::primitives::{primitive, special_record, ByteSize};

/// Byte offset of one field within a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldOffset {
    pub name: String,
    pub offset: u32,
}

/// Computed layout of a record under one default alignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLayout {
    pub size: u32,
    pub align: u32,
    /// Offsets in declaration order.
    pub offsets: Vec<FieldOffset>,
}

/// Memo for one layout computation; nested records and unions are computed
/// once per default alignment.
#[derive(Debug, Default)]
struct LayoutMemo {
    records: HashMap<RecordId, Option<RecordLayout>>,
    unions: HashMap<UnionId, Option<(u32, u32)>>,
    in_flight: HashSet<RecordId>,
    failures: Vec<RecordId>,
}

impl Parser {
    /// Computes the layout of a record under `default_align` (4 or 8).
    ///
    /// Deterministic for a given model: re-running with the same default
    /// alignment yields byte-identical results. Returns `None` for skipped
    /// records and for records with unresolvable field types.
    #[must_use]
    pub fn record_layout(&self, id: RecordId, default_align: u32) -> Option<RecordLayout> {
        let mut memo = LayoutMemo::default();
        self.layout_record(id, default_align, &mut memo)
    }

    fn layout_record(&self, id: RecordId, d: u32, memo: &mut LayoutMemo) -> Option<RecordLayout> {
        if let Some(cached) = memo.records.get(&id) {
            return cached.clone();
        }
        // cycles across records are assumed absent; break them defensively
        if !memo.in_flight.insert(id) {
            return None;
        }
        let result = self.layout_record_uncached(id, d, memo);
        memo.in_flight.remove(&id);
        if result.is_none() {
            memo.failures.push(id);
        }
        memo.records.insert(id, result.clone());
        result
    }

    fn layout_record_uncached(&self, id: RecordId, d: u32, memo: &mut LayoutMemo) -> Option<RecordLayout> {
        let rec = self.record(id);
        if rec.skipped {
            return None;
        }
        let pack_cap = match rec.pack {
            Pack::Explicit(n) => Some(n),
            // a lone [4] on the pack stack means the platform ABI default
            // pack of 4 was restored
            Pack::PlatformAbi => Some(4),
            Pack::Default => None,
        };
        if rec.fields.is_empty() {
            return Some(RecordLayout {
                size: 1,
                align: pack_cap.unwrap_or(d),
                offsets: Vec::new(),
            });
        }

        let mut record_align = pack_cap.unwrap_or(d);
        let mut max_field_size = 0u32;
        let mut offset = 0u32;
        let mut offsets = Vec::with_capacity(rec.fields.len());
        for field in &rec.fields {
            let (size, natural) = self.type_layout(&field.ctype, d, memo)?;
            let size = size.bytes();
            let mut align = natural.bytes().min(d);
            if let Some(cap) = pack_cap {
                align = align.min(cap);
            }
            if align > 0 {
                offset += (align - offset % align) % align;
            }
            offsets.push(FieldOffset {
                name: field.name.clone(),
                offset,
            });
            record_align = record_align.max(align);
            max_field_size = max_field_size.max(size);
            let count = match &field.array_len_text {
                None => 1,
                Some(text) => self.array_len(text)? as u32,
            };
            offset += size * count.max(1);
        }

        // no trailing padding up to record_align, matching the SDK's
        // observed layout
        Some(RecordLayout {
            size: offset,
            align: max_field_size.min(record_align),
            offsets,
        })
    }

    /// Computes the size and alignment of a union under `default_align`:
    /// the largest member rounded up to that member's alignment.
    #[must_use]
    pub fn union_layout(&self, id: UnionId, default_align: u32) -> Option<(u32, u32)> {
        let mut memo = LayoutMemo::default();
        self.layout_union(id, default_align, &mut memo)
    }

    fn layout_union(&self, id: UnionId, d: u32, memo: &mut LayoutMemo) -> Option<(u32, u32)> {
        if let Some(cached) = memo.unions.get(&id) {
            return *cached;
        }
        let result = self.layout_union_uncached(id, d, memo);
        memo.unions.insert(id, result);
        result
    }

    fn layout_union_uncached(&self, id: UnionId, d: u32, memo: &mut LayoutMemo) -> Option<(u32, u32)> {
        let u = self.union(id);
        if u.fields.is_empty() {
            return Some((1, 1));
        }
        let mut max_total = 0u32;
        let mut align_of_max = d;
        for field in &u.fields {
            let (size, natural) = self.type_layout(&field.ctype, d, memo)?;
            let count = match &field.array_len_text {
                None => 1,
                Some(text) => self.array_len(text)? as u32,
            };
            let total = size.bytes() * count.max(1);
            if total > max_total {
                max_total = total;
                align_of_max = natural.bytes();
            }
        }
        let size = if align_of_max > 0 {
            max_total.div_ceil(align_of_max) * align_of_max
        } else {
            max_total
        };
        Some((size, align_of_max))
    }

    /// Size and natural alignment of a field type. Searches the public
    /// resolution chain first, then unions and nested records, recursing
    /// into records whose layout is not yet in the memo.
    fn type_layout(&self, name: &str, d: u32, memo: &mut LayoutMemo) -> Option<(ByteSize, ByteSize)> {
        if let Some(p) = primitive(name) {
            return Some((p.size, p.align));
        }
        if name.contains('*') {
            return Some((ByteSize::Ptr, ByteSize::Ptr));
        }
        if let Some(s) = special_record(name) {
            return Some((ByteSize::Fixed(s.size), ByteSize::Fixed(s.align)));
        }
        if let Some(td) = self.typedef_by_name(name) {
            return td.size.zip(td.align);
        }
        if self.enum_by_name(name).is_some() {
            return Some((
                ByteSize::Fixed(crate::model::Enum::SIZE),
                ByteSize::Fixed(crate::model::Enum::ALIGN),
            ));
        }
        if let Some(rid) = self.record_id_by_name(name) {
            let layout = self.layout_record(rid, d, memo)?;
            return Some((ByteSize::Fixed(layout.size), ByteSize::Fixed(layout.align)));
        }
        if let Some(uid) = self.union_id_by_name(name) {
            let (size, align) = self.layout_union(uid, d, memo)?;
            return Some((ByteSize::Fixed(size), ByteSize::Fixed(align)));
        }
        None
    }

    fn array_len(&self, text: &str) -> Option<u64> {
        let value = match text.parse::<u64>() {
            Ok(n) => return Some(n),
            Err(_) => self.eval_const_expr(text)?,
        };
        u64::try_from(value).ok()
    }

    /// Runs the layout engine twice per record (defaults 8 and 4) and marks
    /// records whose size or field offsets differ between the two.
    pub(crate) fn classify_pack_awareness(&mut self) {
        let mut memo8 = LayoutMemo::default();
        let mut memo4 = LayoutMemo::default();
        let mut aware = Vec::new();
        let mut aware_names = Vec::new();

        for (idx, rec) in self.records.iter().enumerate() {
            let id = RecordId(idx as u32);
            if rec.skipped {
                continue;
            }
            if rec.is_sequential() {
                if self.settings.contains(crate::Settings::PRINT_DEBUG) {
                    log::debug!("record {} aligns by platform ABI default, sequential", rec.name);
                }
                continue;
            }
            let large = self.layout_record(id, 8, &mut memo8);
            let small = self.layout_record(id, 4, &mut memo4);
            let (Some(large), Some(small)) = (large, small) else {
                continue;
            };
            let mut large_offsets = large.offsets;
            let mut small_offsets = small.offsets;
            large_offsets.sort_by(|a, b| a.name.cmp(&b.name));
            small_offsets.sort_by(|a, b| a.name.cmp(&b.name));
            if large.size != small.size || large_offsets != small_offsets {
                if self.settings.contains(crate::Settings::PRINT_DEBUG) {
                    log::debug!("found packsize aware record '{}'", rec.name);
                }
                aware.push(id);
                aware_names.push(rec.name.clone());
            }
        }

        for id in aware {
            self.records[id.0 as usize].packsize_aware = true;
        }
        self.pack_size_aware = aware_names;
        let failures: Vec<RecordId> = memo8.failures.into_iter().chain(memo4.failures).collect();
        self.record_layout_failures(failures);
    }

    /// Publishes the supported ABI's layout (default alignment 8) on every
    /// record, union, and field.
    pub(crate) fn finalize_layouts(&mut self) {
        let mut memo = LayoutMemo::default();

        let mut record_results = Vec::new();
        for idx in 0..self.records.len() {
            let id = RecordId(idx as u32);
            if self.records[idx].skipped {
                continue;
            }
            if let Some(layout) = self.layout_record(id, 8, &mut memo) {
                record_results.push((idx, layout.size, layout.align));
            }
        }
        for (idx, size, align) in record_results {
            self.records[idx].size = Some(size);
            self.records[idx].align = Some(align);
        }

        let mut union_results = Vec::new();
        for idx in 0..self.unions.len() {
            let id = UnionId(idx as u32);
            if let Some((size, align)) = self.layout_union(id, 8, &mut memo) {
                union_results.push((idx, size, align));
            }
        }
        for (idx, size, align) in union_results {
            self.unions[idx].size = Some(size);
            self.unions[idx].align = Some(align);
        }

        // per-field resolved element size, natural alignment, array length
        let mut field_results = Vec::new();
        for (ridx, rec) in self.records.iter().enumerate() {
            for (fidx, field) in rec.fields.iter().enumerate() {
                let layout = self.type_layout(&field.ctype, 8, &mut memo);
                let len = field.array_len_text.as_deref().and_then(|t| self.array_len(t));
                field_results.push((ridx, fidx, layout, len));
            }
        }
        for (ridx, fidx, layout, len) in field_results {
            let field = &mut self.records[ridx].fields[fidx];
            if let Some((size, align)) = layout {
                field.size = Some(size);
                field.align = Some(align);
            }
            field.array_len = len;
        }

        let mut union_field_results = Vec::new();
        for (uidx, u) in self.unions.iter().enumerate() {
            for (fidx, field) in u.fields.iter().enumerate() {
                let layout = self.type_layout(&field.ctype, 8, &mut memo);
                let len = field.array_len_text.as_deref().and_then(|t| self.array_len(t));
                union_field_results.push((uidx, fidx, layout, len));
            }
        }
        for (uidx, fidx, layout, len) in union_field_results {
            let field = &mut self.unions[uidx].fields[fidx];
            if let Some((size, align)) = layout {
                field.size = Some(size);
                field.align = Some(align);
            }
            field.array_len = len;
        }

        let failures = std::mem::take(&mut memo.failures);
        self.record_layout_failures(failures);
    }

    fn record_layout_failures(&mut self, failures: Vec<RecordId>) {
        for id in failures {
            let rec = &mut self.records[id.0 as usize];
            if rec.skipped {
                continue;
            }
            rec.skipped = true;
            let name = rec.name.clone();
            if !self.ignored_structs.contains(&id) {
                self.ignored_structs.push(id);
            }
            self.diags.warn_global(format!(
                "record \"{name}\" has a field whose type could not be resolved; layout skipped"
            ));
        }
    }
}

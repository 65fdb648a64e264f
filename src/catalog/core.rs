//! Catalog operations over the relcat and attrcat heap files.

use tracing::debug;

use crate::datum::{AttrType, CompOp, Value};
use crate::heap::{HeapManager, ScanFilter};

use super::error::CatalogError;
use super::schema::{
    attrcat_attributes, name_field_len, name_filter_offset, relcat_attributes, AttrDef, AttrInfo,
    AttrSpecs, RelationEntry, ATTRCAT_RECORD_SIZE, MAX_NAME, RELCAT_RECORD_SIZE,
};

/// Name of the relation catalog.
pub const RELCAT_NAME: &str = "relcat";

/// Name of the attribute catalog.
pub const ATTRCAT_NAME: &str = "attrcat";

/// Returns true for the system catalog relation names.
pub fn is_reserved(name: &str) -> bool {
    name == RELCAT_NAME || name == ATTRCAT_NAME
}

/// The system catalog.
///
/// Metadata lives in two heap files under the same directory as the
/// relations they describe; the catalog relations themselves answer
/// [`rel_entry`](Catalog::rel_entry) and [`attributes`](Catalog::attributes)
/// from hardcoded schemas so they can be scanned like any other relation.
pub struct Catalog {
    heap: HeapManager,
}

impl Catalog {
    /// Opens the catalog, creating relcat and attrcat on first use.
    pub fn open(heap: HeapManager) -> Result<Self, CatalogError> {
        if !heap.file_exists(RELCAT_NAME) {
            heap.create_file(RELCAT_NAME, RELCAT_RECORD_SIZE, 0)?;
            heap.create_file(ATTRCAT_NAME, ATTRCAT_RECORD_SIZE, 0)?;
            debug!(dir = %heap.dir().display(), "catalog bootstrapped");
        }
        Ok(Self { heap })
    }

    /// Fetches the catalog entry for `name`.
    pub fn rel_entry(&self, name: &str) -> Result<RelationEntry, CatalogError> {
        if is_reserved(name) {
            return self.system_rel_entry(name);
        }
        let relcat = self.heap.open_file(RELCAT_NAME)?;
        let mut scan = relcat.scan(Some(name_filter(name)));
        match scan.next_record()? {
            Some(rec) => RelationEntry::from_record(&rec.data),
            None => Err(CatalogError::RelationNotFound { name: name.into() }),
        }
    }

    /// Rewrites the catalog entry for `entry.rel_name`.
    pub fn update_rel_entry(&self, entry: &RelationEntry) -> Result<(), CatalogError> {
        if is_reserved(&entry.rel_name) {
            return Err(CatalogError::ReservedName {
                name: entry.rel_name.clone(),
            });
        }
        let relcat = self.heap.open_file(RELCAT_NAME)?;
        let mut scan = relcat.scan(Some(name_filter(&entry.rel_name)));
        let mut rec = scan.next_record()?.ok_or_else(|| CatalogError::RelationNotFound {
            name: entry.rel_name.clone(),
        })?;
        rec.data = entry.to_record();
        relcat.update(&rec)?;
        Ok(())
    }

    /// Returns the attribute descriptors of `name`, sorted by offset.
    pub fn attributes(&self, name: &str) -> Result<Vec<AttrInfo>, CatalogError> {
        if name == RELCAT_NAME {
            return Ok(relcat_attributes());
        }
        if name == ATTRCAT_NAME {
            return Ok(attrcat_attributes());
        }
        let attrcat = self.heap.open_file(ATTRCAT_NAME)?;
        let mut scan = attrcat.scan(Some(name_filter(name)));
        let mut attrs = Vec::new();
        while let Some(rec) = scan.next_record()? {
            attrs.push(AttrInfo::from_record(&rec.data)?);
        }
        if attrs.is_empty() {
            return Err(CatalogError::RelationNotFound { name: name.into() });
        }
        attrs.sort_by_key(|a| a.offset);
        Ok(attrs)
    }

    /// Defines a new relation and creates its heap file.
    pub fn create_table(&self, name: &str, defs: &[AttrDef]) -> Result<(), CatalogError> {
        if is_reserved(name) {
            return Err(CatalogError::ReservedName { name: name.into() });
        }
        if name.len() > MAX_NAME {
            return Err(CatalogError::NameTooLong { name: name.into() });
        }
        if defs.is_empty() {
            return Err(CatalogError::NoAttributes { rel: name.into() });
        }
        for (i, def) in defs.iter().enumerate() {
            if def.name.len() > MAX_NAME {
                return Err(CatalogError::NameTooLong {
                    name: def.name.clone(),
                });
            }
            if defs[..i].iter().any(|d| d.name == def.name) {
                return Err(CatalogError::DuplicateAttr {
                    rel: name.into(),
                    attr: def.name.clone(),
                });
            }
        }

        {
            let relcat = self.heap.open_file(RELCAT_NAME)?;
            let mut scan = relcat.scan(Some(name_filter(name)));
            if scan.next_record()?.is_some() {
                return Err(CatalogError::RelationExists { name: name.into() });
            }
        }

        // Lay attributes out sequentially; nullable ones take null-array
        // indices in declaration order.
        let mut attrs = Vec::with_capacity(defs.len());
        let mut offset = 0usize;
        let mut nullable_index = 0u16;
        for def in defs {
            let attr_size = def.attr_type.field_size(def.display_len);
            attrs.push(AttrInfo {
                rel_name: name.into(),
                attr_name: def.name.clone(),
                offset,
                attr_type: def.attr_type,
                attr_size,
                display_len: def.display_len,
                specs: if def.notnull {
                    AttrSpecs::NOTNULL
                } else {
                    AttrSpecs::NONE
                },
                nullable_index: if def.notnull {
                    None
                } else {
                    let i = nullable_index;
                    nullable_index += 1;
                    Some(i)
                },
            });
            offset += attr_size;
        }
        let tuple_length = offset;
        let null_count = nullable_index as usize;

        self.heap.create_file(name, tuple_length, null_count)?;

        // NOTE: A failure between the row inserts below leaves a partial
        // definition behind; a real system would make this atomic.
        let relcat = self.heap.open_file(RELCAT_NAME)?;
        let entry = RelationEntry {
            rel_name: name.into(),
            tuple_length,
            record_count: 0,
            attr_count: defs.len(),
        };
        relcat.insert(&entry.to_record(), &[])?;

        let attrcat = self.heap.open_file(ATTRCAT_NAME)?;
        for attr in &attrs {
            attrcat.insert(&attr.to_record(), &[])?;
        }
        debug!(rel = name, attrs = attrs.len(), tuple_length, "relation created");
        Ok(())
    }

    /// Removes a relation's definition and destroys its heap file.
    pub fn drop_table(&self, name: &str) -> Result<(), CatalogError> {
        if is_reserved(name) {
            return Err(CatalogError::ReservedName { name: name.into() });
        }

        let relcat = self.heap.open_file(RELCAT_NAME)?;
        let mut scan = relcat.scan(Some(name_filter(name)));
        let rec = scan
            .next_record()?
            .ok_or_else(|| CatalogError::RelationNotFound { name: name.into() })?;
        relcat.delete(rec.rid)?;

        let attrcat = self.heap.open_file(ATTRCAT_NAME)?;
        let mut scan = attrcat.scan(Some(name_filter(name)));
        while let Some(rec) = scan.next_record()? {
            attrcat.delete(rec.rid)?;
        }

        self.heap.destroy_file(name)?;
        debug!(rel = name, "relation dropped");
        Ok(())
    }

    /// relcat and attrcat answer from their scan state and hardcoded
    /// schemas instead of self-describing rows, so their entries are
    /// always consistent with the files.
    fn system_rel_entry(&self, name: &str) -> Result<RelationEntry, CatalogError> {
        let file = self.heap.open_file(name)?;
        let mut scan = file.scan(None);
        let mut record_count = 0;
        while scan.next_record()?.is_some() {
            record_count += 1;
        }
        let (tuple_length, attr_count) = if name == RELCAT_NAME {
            (RELCAT_RECORD_SIZE, relcat_attributes().len())
        } else {
            (ATTRCAT_RECORD_SIZE, attrcat_attributes().len())
        };
        Ok(RelationEntry {
            rel_name: name.into(),
            tuple_length,
            record_count,
            attr_count,
        })
    }
}

fn name_filter(name: &str) -> ScanFilter {
    ScanFilter {
        attr_type: AttrType::Str,
        len: name_field_len(),
        offset: name_filter_offset(),
        op: CompOp::Eq,
        value: Value::Str(name.to_string()),
    }
}

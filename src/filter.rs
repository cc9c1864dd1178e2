//! Composite-USB transport-node filter.
//!
//! A composite device exposes one interface node (`MI_xx`, no `COL_xx`) plus
//! one collection node per logical endpoint (`MI_xx&COL_yy`). Left alone the
//! interface node shows up as an extra, input-less device.
//!
//! A record is dropped iff
//! - it carries an interface marker and no collection marker, and
//! - another record in the same batch with the same vendor, product and
//!   interface number carries a collection marker, and
//! - it is not a keyboard or mouse (for those, the interface node is often the
//!   only node that will ever exist).

use std::collections::HashSet;

use log::debug;

use crate::device::DeviceRecord;
use crate::identity::CanonicalId;

type SiblingKey<'a> = (u32, u32, &'a str);

fn sibling_key(id: &CanonicalId) -> Option<SiblingKey<'_>> {
    id.interface
        .as_deref()
        .map(|mi| (id.vendor, id.product, mi))
}

fn candidate(rec: &DeviceRecord) -> bool {
    !rec.class.is_keyboard_or_mouse()
        && rec.id.has_interface_marker()
        && !rec.id.has_collection_marker()
}

/// `true` if `rec` is a transport node with respect to `batch`.
pub fn is_transport_node(rec: &DeviceRecord, batch: &[DeviceRecord]) -> bool {
    let Some(key) = sibling_key(&rec.id).filter(|_| candidate(rec)) else {
        return false;
    };
    batch
        .iter()
        .filter(|s| s.id.has_collection_marker())
        .any(|s| sibling_key(&s.id) == Some(key))
}

/// Drop every transport node from one source's batch, keeping order.
pub fn filter_transport_nodes(batch: Vec<DeviceRecord>) -> Vec<DeviceRecord> {
    let with_collection: HashSet<(u32, u32, String)> = batch
        .iter()
        .filter(|r| r.id.has_collection_marker())
        .filter_map(|r| sibling_key(&r.id))
        .map(|(v, p, mi)| (v, p, mi.to_owned()))
        .collect();

    if with_collection.is_empty() {
        return batch;
    }

    batch
        .into_iter()
        .filter(|rec| {
            let drop = candidate(rec)
                && sibling_key(&rec.id).is_some_and(|(v, p, mi)| {
                    with_collection.contains(&(v, p, mi.to_owned()))
                });
            if drop {
                debug!(
                    "[FILTER] {} {}: interface node with collection siblings, dropped",
                    rec.source, rec.id
                );
            }
            !drop
        })
        .collect()
}

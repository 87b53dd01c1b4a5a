use crate::tree::{name_decode, NodeId, Tree};

pub const UNKNOWN_CONTINENT: &str = "UNKNOWN";

/// Record returned by the sequence database for a leaf.
#[derive(Debug, Clone, Default)]
pub struct SeqdbEntry {
    pub amino_acids: String,
    pub date: String,
    pub continent: Option<String>,
}

/// Sequence database collaborator: looks up a leaf by its seq id.
pub trait SequenceDb {
    fn find(&self, seq_id: &str) -> Option<SeqdbEntry>;
}

/// Location database collaborator: maps a location name to a continent.
pub trait LocationDb {
    fn continent(&self, location: &str) -> Option<String>;
}

/// Fills leaf sequence, date and continent from the sequence database.
/// Leaves without a match keep their data gaps; that is never fatal.
pub fn match_seqdb(tree: &mut Tree, seqdb: &dyn SequenceDb) {
    let leaves: Vec<NodeId> = tree.leaves().collect();
    let mut matched = 0usize;
    for id in leaves {
        let Some(entry) = seqdb.find(&tree[id].name) else {
            continue;
        };
        matched += 1;
        let node = tree.node_mut(id);
        if !entry.amino_acids.is_empty() {
            node.sequence = Some(entry.amino_acids);
        }
        if !entry.date.is_empty() {
            node.date = Some(entry.date);
        }
        if entry.continent.is_some() {
            node.continent = entry.continent;
        }
    }
    log::debug!("matched {matched} leaves against seqdb");
}

/// Assigns a continent to every leaf that does not have one yet, looking up
/// the location parsed from the seq id and defaulting to "UNKNOWN".
pub fn set_continents(tree: &mut Tree, locdb: &dyn LocationDb) {
    let leaves: Vec<NodeId> = tree.leaves().collect();
    for id in leaves {
        if tree[id].continent.as_deref().is_some_and(|c| !c.is_empty()) {
            continue;
        }
        let continent = location_from_seq_id(&tree[id].name)
            .and_then(|location| locdb.continent(&location))
            .unwrap_or_else(|| UNKNOWN_CONTINENT.to_string());
        tree.node_mut(id).continent = Some(continent);
    }
}

/// Location segment of a strain name: the segment after the virus type for
/// "A(H3N2)/TEXAS/50/2012" or "B/BRISBANE/60/2008" style names, the first
/// segment otherwise.
pub fn location_from_seq_id(seq_id: &str) -> Option<String> {
    let name = name_decode(seq_id);
    let mut segments = name.split('/');
    let first = segments.next()?;
    let is_type = first == "B" || first == "A" || (first.starts_with("A(") && first.ends_with(')'));
    let location = if is_type { segments.next()? } else { first };
    if location.is_empty() {
        None
    } else {
        Some(location.to_string())
    }
}

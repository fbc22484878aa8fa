//! Taxonomy tree builder
//!
//! Merges root-first lineages into one rooted tree. Nodes live in an arena and
//! a global `id -> placements` index answers "where is this taxon already?" in
//! constant time.
//!
//! Two conflict policies decide what happens when a lineage would put a taxon
//! under a parent other than the one it already has:
//!
//! - `Strict` rejects the whole lineage with `InconsistentParentage`. Nothing
//!   from a rejected lineage is inserted, so every taxon has exactly one placement.
//! - `Permissive` inserts the taxon again under the new parent and records the
//!   conflict. Matching is only done among the current node's children.

use crate::error::{IngestError, Result};
use crate::models::{Lineage, TaxonId, TaxonRecord};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

/// Placeholder name for taxa without metadata
pub const UNKNOWN_TAXON_NAME: &str = "Unknown";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    #[default]
    Strict,
    Permissive,
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => f.write_str("strict"),
            Self::Permissive => f.write_str("permissive"),
        }
    }
}

impl FromStr for ConflictPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "permissive" => Ok(Self::Permissive),
            other => Err(format!(
                "Invalid conflict policy: '{}'. Valid values: strict, permissive",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Taxon,
    Species,
}

/// Position of a node in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(usize);

const ROOT: NodeIndex = NodeIndex(0);

#[derive(Debug, Clone)]
pub struct TreeNode {
    pub id: TaxonId,
    pub name: String,
    pub rank: i32,
    pub kind: NodeKind,
    parent: Option<NodeIndex>,
    children: Vec<NodeIndex>,
}

impl TreeNode {
    pub fn parent_index(&self) -> Option<NodeIndex> {
        self.parent
    }

    pub fn child_indices(&self) -> &[NodeIndex] {
        &self.children
    }
}

/// A taxon seen under two different parents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentageConflict {
    pub taxon_id: TaxonId,
    pub existing_parent: TaxonId,
    pub attempted_parent: TaxonId,
}

/// Serializable nested view, children ordered by name then id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedNode {
    pub id: TaxonId,
    pub name: String,
    pub rank: i32,
    pub kind: NodeKind,
    pub children: Vec<NestedNode>,
}

#[derive(Debug, Clone)]
pub struct TaxonomyTree {
    nodes: Vec<TreeNode>,
    index: HashMap<TaxonId, Vec<NodeIndex>>,
    policy: ConflictPolicy,
    conflicts: Vec<ParentageConflict>,
}

impl TaxonomyTree {
    pub fn new(root: &TaxonRecord, policy: ConflictPolicy) -> Self {
        let node = TreeNode {
            id: root.id.clone(),
            name: root.name.clone(),
            rank: root.rank,
            kind: NodeKind::Taxon,
            parent: None,
            children: Vec::new(),
        };

        let mut index = HashMap::new();
        index.insert(root.id.clone(), vec![ROOT]);

        Self {
            nodes: vec![node],
            index,
            policy,
            conflicts: Vec::new(),
        }
    }

    pub fn policy(&self) -> ConflictPolicy {
        self.policy
    }

    pub fn root(&self) -> &TreeNode {
        &self.nodes[ROOT.0]
    }

    pub fn node(&self, index: NodeIndex) -> &TreeNode {
        &self.nodes[index.0]
    }

    /// First placement of a taxon
    pub fn get(&self, id: &TaxonId) -> Option<&TreeNode> {
        self.first_placement(id).map(|idx| self.node(idx))
    }

    /// Every position the taxon occupies; more than one only under `Permissive`
    pub fn placements(&self, id: &TaxonId) -> &[NodeIndex] {
        self.index.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn children(&self, id: &TaxonId) -> Vec<&TreeNode> {
        self.first_placement(id)
            .map(|idx| self.node(idx).children.iter().map(|c| self.node(*c)).collect())
            .unwrap_or_default()
    }

    pub fn parent(&self, id: &TaxonId) -> Option<&TreeNode> {
        self.get(id)
            .and_then(|node| node.parent)
            .map(|idx| self.node(idx))
    }

    /// Ids from the root down to the first placement of `id`
    pub fn path_to(&self, id: &TaxonId) -> Option<Vec<TaxonId>> {
        let mut path = Vec::new();
        let mut current = self.first_placement(id);
        while let Some(idx) = current {
            let node = self.node(idx);
            path.push(node.id.clone());
            current = node.parent;
        }
        if path.is_empty() {
            return None;
        }
        path.reverse();
        Some(path)
    }

    /// Number of nodes, duplicated placements included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of distinct taxa placed in the tree
    pub fn taxon_count(&self) -> usize {
        self.index.len()
    }

    pub fn species_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.kind == NodeKind::Species).count()
    }

    pub fn conflicts(&self) -> &[ParentageConflict] {
        &self.conflicts
    }

    fn first_placement(&self, id: &TaxonId) -> Option<NodeIndex> {
        self.index.get(id).and_then(|v| v.first().copied())
    }

    /// Placement of `id` directly under `parent`, if any
    fn child_with_id(&self, parent: NodeIndex, id: &TaxonId) -> Option<NodeIndex> {
        self.placements(id)
            .iter()
            .copied()
            .find(|idx| self.node(*idx).parent == Some(parent))
    }

    /// Parent id of an already placed taxon. `Some(None)` for the root.
    fn placed_parent(&self, id: &TaxonId) -> Option<Option<&TaxonId>> {
        self.get(id)
            .map(|node| node.parent.map(|p| &self.node(p).id))
    }

    fn add_child(
        &mut self,
        parent: NodeIndex,
        id: &TaxonId,
        taxon_info: &HashMap<TaxonId, TaxonRecord>,
    ) -> NodeIndex {
        let (name, rank) = taxon_info
            .get(id)
            .map(|r| (r.name.clone(), r.rank))
            .unwrap_or_else(|| (UNKNOWN_TAXON_NAME.to_string(), 0));

        let idx = NodeIndex(self.nodes.len());
        self.nodes.push(TreeNode {
            id: id.clone(),
            name,
            rank,
            kind: NodeKind::Taxon,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(idx);
        self.index.entry(id.clone()).or_default().push(idx);
        idx
    }

    /// Check every edge of `lineage` against existing placements and against
    /// earlier edges of the same lineage
    fn check_consistency(&self, lineage: &Lineage) -> Result<()> {
        let mut planned: HashMap<&TaxonId, &TaxonId> = HashMap::new();

        for (parent, child) in lineage.edges() {
            let known = match self.placed_parent(child) {
                // The root has no parent, so any edge into it is a contradiction
                Some(None) => {
                    return Err(IngestError::InconsistentParentage {
                        taxon_id: child.clone(),
                        existing_parent: child.clone(),
                        attempted_parent: parent.clone(),
                    });
                }
                Some(Some(existing)) => Some(existing),
                None => planned.get(child).copied(),
            };

            match known {
                Some(existing) if existing != parent => {
                    return Err(IngestError::InconsistentParentage {
                        taxon_id: child.clone(),
                        existing_parent: existing.clone(),
                        attempted_parent: parent.clone(),
                    });
                }
                Some(_) => {}
                None => {
                    planned.insert(child, parent);
                }
            }
        }

        Ok(())
    }

    /// Merge one lineage; returns the node of its last element
    pub fn insert_lineage(
        &mut self,
        lineage: &Lineage,
        taxon_info: &HashMap<TaxonId, TaxonRecord>,
    ) -> Result<NodeIndex> {
        if lineage.root() != &self.root().id {
            return Err(IngestError::DetachedLineage {
                species_id: lineage.species().clone(),
                first: lineage.root().clone(),
            });
        }

        if self.policy == ConflictPolicy::Strict {
            self.check_consistency(lineage)?;
        }

        let mut current = ROOT;
        for (parent, child) in lineage.edges() {
            current = match self.child_with_id(current, child) {
                Some(existing) => existing,
                None => {
                    if let Some(existing) = self.placed_parent(child) {
                        let conflict = ParentageConflict {
                            taxon_id: child.clone(),
                            existing_parent: existing.unwrap_or(child).clone(),
                            attempted_parent: parent.clone(),
                        };
                        warn!(
                            taxon_id = %conflict.taxon_id,
                            existing_parent = %conflict.existing_parent,
                            attempted_parent = %conflict.attempted_parent,
                            "Taxon placed under a second parent"
                        );
                        self.conflicts.push(conflict);
                    }
                    self.add_child(current, child, taxon_info)
                }
            };
        }

        if current != ROOT {
            self.nodes[current.0].kind = NodeKind::Species;
        }
        Ok(current)
    }

    fn nested(&self, idx: NodeIndex) -> NestedNode {
        let node = self.node(idx);
        let mut children: Vec<NestedNode> =
            node.children.iter().map(|c| self.nested(*c)).collect();
        children.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));

        NestedNode {
            id: node.id.clone(),
            name: node.name.clone(),
            rank: node.rank,
            kind: node.kind,
            children,
        }
    }

    /// Canonical nested form; identical trees give identical output
    pub fn to_nested(&self) -> NestedNode {
        self.nested(ROOT)
    }

    /// One record per distinct taxon, parent taken from the tree, sorted by id
    pub fn to_records(&self) -> Vec<TaxonRecord> {
        let mut records: BTreeMap<&TaxonId, TaxonRecord> = BTreeMap::new();
        for node in &self.nodes {
            records.entry(&node.id).or_insert_with(|| TaxonRecord {
                id: node.id.clone(),
                name: node.name.clone(),
                rank: node.rank,
                parent_id: node.parent.map(|p| self.node(p).id.clone()),
            });
        }
        records.into_values().collect()
    }
}

/// Root selection and conflict handling for `build_tree`
#[derive(Debug, Clone)]
pub struct TreeOptions {
    pub root_name: String,
    pub policy: ConflictPolicy,
}

impl TreeOptions {
    pub fn new(root_name: impl Into<String>, policy: ConflictPolicy) -> Self {
        Self {
            root_name: root_name.into(),
            policy,
        }
    }
}

#[derive(Debug)]
pub struct TreeBuild {
    pub tree: TaxonomyTree,
    /// Lineages refused by the builder, keyed by their last taxon
    pub rejected: Vec<(TaxonId, IngestError)>,
}

/// Build a tree from lineages and taxon metadata
///
/// Fails with `RootNotFound` when no record carries the root name. If several
/// do, the smallest id is used. Per-lineage failures are collected in
/// `rejected` and do not stop the build.
pub fn build_tree(
    lineages: &[Lineage],
    taxon_info: &HashMap<TaxonId, TaxonRecord>,
    options: &TreeOptions,
) -> Result<TreeBuild> {
    let root = taxon_info
        .values()
        .filter(|r| r.name == options.root_name)
        .min_by(|a, b| a.id.cmp(&b.id))
        .ok_or_else(|| IngestError::RootNotFound(options.root_name.clone()))?;

    let mut tree = TaxonomyTree::new(root, options.policy);
    let mut rejected = Vec::new();

    for lineage in lineages {
        match tree.insert_lineage(lineage, taxon_info) {
            Ok(_) => {}
            Err(e) if e.is_unit_failure() => {
                warn!(species_id = %lineage.species(), error = %e, "Lineage rejected");
                rejected.push((lineage.species().clone(), e));
            }
            Err(e) => return Err(e),
        }
    }

    info!(
        nodes = tree.len(),
        taxa = tree.taxon_count(),
        species = tree.species_count(),
        rejected = rejected.len(),
        conflicts = tree.conflicts().len(),
        "Taxonomy tree built"
    );

    Ok(TreeBuild { tree, rejected })
}

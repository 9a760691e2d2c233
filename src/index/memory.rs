//! In-memory feature index backed by per-seqid interval trees.

use crate::error::{GfiError, Result};
use crate::index::{sort_features, FeatureIndex};
use crate::interval_tree::{IntervalTree, NodeId};
use crate::node::{FeatureNode, RegionNode};
use crate::range::Range;
use log::debug;
use rustc_hash::FxHashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Everything known about one seqid.
#[derive(Debug, Default)]
struct RegionInfo {
    features: IntervalTree<Arc<FeatureNode>>,
    region: Option<Arc<RegionNode>>,
    /// Bounding range of all features added so far.
    dyn_range: Option<Range>,
}

impl RegionInfo {
    fn track(&mut self, range: Range) {
        self.dyn_range = Some(match self.dyn_range {
            Some(current) => current.join(&range),
            None => range,
        });
    }
}

/// Where an indexed feature lives.
#[derive(Debug)]
struct Entry {
    id: u64,
    seqid: String,
    tree_node: NodeId,
}

#[derive(Debug, Default)]
struct IndexState {
    regions: FxHashMap<String, RegionInfo>,
    first_seqid: Option<String>,
    next_id: u64,
    /// Indexed features keyed by `Arc` address.
    entries: FxHashMap<usize, Entry>,
    by_id: FxHashMap<u64, Arc<FeatureNode>>,
}

impl IndexState {
    fn region_info(&mut self, seqid: &str) -> &mut RegionInfo {
        if self.first_seqid.is_none() {
            debug!("first seqid in feature index: {}", seqid);
            self.first_seqid = Some(seqid.to_string());
        }
        if !self.regions.contains_key(seqid) {
            debug!("new seqid in feature index: {}", seqid);
        }
        self.regions.entry(seqid.to_string()).or_default()
    }

    fn lookup(&self, seqid: &str) -> Result<&RegionInfo> {
        self.regions
            .get(seqid)
            .ok_or_else(|| GfiError::SeqidNotFound(seqid.to_string()))
    }
}

#[inline]
fn node_key(feature: &Arc<FeatureNode>) -> usize {
    Arc::as_ptr(feature) as usize
}

/// A [`FeatureIndex`] held completely in memory.
///
/// One `RwLock` guards the whole index: queries share it, every mutation
/// takes it exclusively.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use gfi_genomics::prelude::*;
///
/// let index = FeatureIndexMemory::new();
/// let gene = Arc::new(FeatureNode::new("ctg1", "gene", Range::new(100, 900), Strand::Forward));
/// index.add_feature_node(&gene).unwrap();
///
/// let hits = index.get_features_for_range("ctg1", Range::new(800, 1000)).unwrap();
/// assert_eq!(hits.len(), 1);
/// assert_eq!(index.get_range_for_seqid("ctg1").unwrap(), Range::new(100, 900));
/// ```
#[derive(Debug, Default)]
pub struct FeatureIndexMemory {
    state: RwLock<IndexState>,
}

impl FeatureIndexMemory {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, IndexState>> {
        Ok(self.state.read()?)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, IndexState>> {
        Ok(self.state.write()?)
    }

    /// Number of indexed features.
    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.entries.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Synthetic id assigned to `feature` when it was added.
    pub fn node_id(&self, feature: &Arc<FeatureNode>) -> Result<Option<u64>> {
        Ok(self.read()?.entries.get(&node_key(feature)).map(|e| e.id))
    }

    /// Look up an indexed feature by its synthetic id.
    pub fn get_node_by_id(&self, id: u64) -> Result<Arc<FeatureNode>> {
        self.read()?
            .by_id
            .get(&id)
            .cloned()
            .ok_or(GfiError::NodeNotFound(id))
    }

    /// Check if this exact feature node is in the index.
    pub fn contains_node(&self, feature: &Arc<FeatureNode>) -> Result<bool> {
        Ok(self.read()?.entries.contains_key(&node_key(feature)))
    }
}

impl FeatureIndex for FeatureIndexMemory {
    fn add_region_node(&self, region: &Arc<RegionNode>) -> Result<()> {
        let mut state = self.write()?;
        if state.regions.contains_key(region.seqid()) {
            return Ok(());
        }
        state.region_info(region.seqid()).region = Some(Arc::clone(region));
        Ok(())
    }

    fn add_feature_node(&self, feature: &Arc<FeatureNode>) -> Result<()> {
        let key = node_key(feature);
        let mut state = self.write()?;
        if state.entries.contains_key(&key) {
            debug!(
                "feature {} {} on {} is already indexed",
                feature.feature_type(),
                feature.range(),
                feature.seqid()
            );
            return Ok(());
        }

        let range = feature.range();
        let info = state.region_info(feature.seqid());
        let tree_node = info
            .features
            .insert(range.start(), range.end(), Arc::clone(feature));
        info.track(range);

        let id = state.next_id;
        state.next_id += 1;
        state.entries.insert(
            key,
            Entry {
                id,
                seqid: feature.seqid().to_string(),
                tree_node,
            },
        );
        state.by_id.insert(id, Arc::clone(feature));
        Ok(())
    }

    fn remove_node(&self, feature: &Arc<FeatureNode>) -> Result<()> {
        let mut state = self.write()?;
        let Some(entry) = state.entries.remove(&node_key(feature)) else {
            return Ok(());
        };
        state.by_id.remove(&entry.id);
        if let Some(info) = state.regions.get_mut(&entry.seqid) {
            info.features.remove(entry.tree_node);
        }
        Ok(())
    }

    fn get_features_for_seqid(&self, seqid: &str) -> Result<Vec<Arc<FeatureNode>>> {
        let state = self.read()?;
        let info = state.lookup(seqid)?;
        Ok(info.features.iter().cloned().collect())
    }

    fn get_features_for_range(&self, seqid: &str, range: Range) -> Result<Vec<Arc<FeatureNode>>> {
        let mut features: Vec<Arc<FeatureNode>> = {
            let state = self.read()?;
            let info = state.lookup(seqid)?;
            info.features
                .find_all_overlapping(range.start(), range.end())
                .into_iter()
                .cloned()
                .collect()
        };
        sort_features(&mut features);
        Ok(features)
    }

    fn get_first_seqid(&self) -> Result<String> {
        self.read()?.first_seqid.clone().ok_or(GfiError::EmptyIndex)
    }

    fn get_seqids(&self) -> Result<Vec<String>> {
        let mut seqids: Vec<String> = self.read()?.regions.keys().cloned().collect();
        seqids.sort_unstable();
        Ok(seqids)
    }

    fn get_range_for_seqid(&self, seqid: &str) -> Result<Range> {
        let state = self.read()?;
        let info = state.lookup(seqid)?;
        info.dyn_range
            .or_else(|| info.region.as_ref().map(|r| r.range()))
            .ok_or_else(|| GfiError::SeqidNotFound(seqid.to_string()))
    }

    fn get_orig_range_for_seqid(&self, seqid: &str) -> Result<Range> {
        let state = self.read()?;
        let info = state.lookup(seqid)?;
        info.region
            .as_ref()
            .map(|r| r.range())
            .or(info.dyn_range)
            .ok_or_else(|| GfiError::SeqidNotFound(seqid.to_string()))
    }

    fn has_seqid(&self, seqid: &str) -> Result<bool> {
        Ok(self.read()?.regions.contains_key(seqid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Strand, GENE};

    fn gene(seqid: &str, start: u64, end: u64) -> Arc<FeatureNode> {
        Arc::new(FeatureNode::new(
            seqid,
            GENE,
            Range::new(start, end),
            Strand::Forward,
        ))
    }

    fn region(seqid: &str, start: u64, end: u64) -> Arc<RegionNode> {
        Arc::new(RegionNode::new(seqid, Range::new(start, end)))
    }

    #[test]
    fn test_region_then_feature_reports_feature_range() {
        let index = FeatureIndexMemory::new();
        index.add_region_node(&region("test1", 100, 1200)).unwrap();
        index.add_feature_node(&gene("test1", 100, 1000)).unwrap();

        assert_eq!(
            index.get_range_for_seqid("test1").unwrap(),
            Range::new(100, 1000)
        );
        assert_eq!(
            index.get_orig_range_for_seqid("test1").unwrap(),
            Range::new(100, 1200)
        );
        assert_eq!(index.get_features_for_seqid("test1").unwrap().len(), 1);
    }

    #[test]
    fn test_range_tracks_features_without_region() {
        let index = FeatureIndexMemory::new();
        index.add_feature_node(&gene("test2", 600, 1200)).unwrap();
        index.add_feature_node(&gene("test2", 50000, 75000)).unwrap();
        assert_eq!(
            index.get_range_for_seqid("test2").unwrap(),
            Range::new(600, 75000)
        );
        assert_eq!(
            index.get_orig_range_for_seqid("test2").unwrap(),
            Range::new(600, 75000)
        );
    }

    #[test]
    fn test_range_query_sorted_by_start() {
        let index = FeatureIndexMemory::new();
        index.add_feature_node(&gene("test1", 500, 1000)).unwrap();
        index.add_feature_node(&gene("test1", 100, 300)).unwrap();
        index.add_feature_node(&gene("test1", 2000, 3000)).unwrap();

        let hits = index
            .get_features_for_range("test1", Range::new(150, 600))
            .unwrap();
        let ranges: Vec<Range> = hits.iter().map(|f| f.range()).collect();
        assert_eq!(ranges, vec![Range::new(100, 300), Range::new(500, 1000)]);
    }

    #[test]
    fn test_has_seqid() {
        let index = FeatureIndexMemory::new();
        assert!(!index.has_seqid("test1").unwrap());
        index.add_region_node(&region("test1", 1, 100)).unwrap();
        assert!(index.has_seqid("test1").unwrap());
        assert!(!index.has_seqid("test2").unwrap());
    }

    #[test]
    fn test_unknown_seqid_is_an_error() {
        let index = FeatureIndexMemory::new();
        index.add_feature_node(&gene("chr1", 1, 10)).unwrap();
        assert!(matches!(
            index.get_features_for_seqid("chr2"),
            Err(GfiError::SeqidNotFound(s)) if s == "chr2"
        ));
        assert!(matches!(
            index.get_features_for_range("chr2", Range::new(1, 10)),
            Err(GfiError::SeqidNotFound(_))
        ));
        assert!(index.get_range_for_seqid("chr2").is_err());
    }

    #[test]
    fn test_seqids_sorted_and_deduplicated() {
        let index = FeatureIndexMemory::new();
        assert!(matches!(index.get_first_seqid(), Err(GfiError::EmptyIndex)));
        for seqid in ["ctg3", "ctg1", "ctg2", "ctg1", "ctg10"] {
            index.add_feature_node(&gene(seqid, 1, 10)).unwrap();
        }
        index.add_region_node(&region("ctg2", 1, 100)).unwrap();
        assert_eq!(
            index.get_seqids().unwrap(),
            vec!["ctg1", "ctg10", "ctg2", "ctg3"]
        );
        assert_eq!(index.get_first_seqid().unwrap(), "ctg3");
    }

    #[test]
    fn test_region_add_is_idempotent() {
        let index = FeatureIndexMemory::new();
        index.add_region_node(&region("b", 1, 100)).unwrap();
        index.add_region_node(&region("a", 1, 100)).unwrap();
        index.add_region_node(&region("b", 50, 500)).unwrap();
        assert_eq!(index.get_seqids().unwrap(), vec!["a", "b"]);
        assert_eq!(index.get_first_seqid().unwrap(), "b");
        assert_eq!(index.get_range_for_seqid("b").unwrap(), Range::new(1, 100));
    }

    #[test]
    fn test_region_only_reports_region_range() {
        let index = FeatureIndexMemory::new();
        index.add_region_node(&region("ctg", 1, 10_000_000)).unwrap();
        assert_eq!(
            index.get_range_for_seqid("ctg").unwrap(),
            Range::new(1, 10_000_000)
        );
        assert!(index.get_features_for_seqid("ctg").unwrap().is_empty());
    }

    #[test]
    fn test_dyn_range_is_min_max_of_features() {
        let index = FeatureIndexMemory::new();
        let ranges = [(5000, 6000), (100, 200), (7000, 9000), (150, 8000)];
        let mut expected: Option<Range> = None;
        for (start, end) in ranges {
            index.add_feature_node(&gene("x", start, end)).unwrap();
            let r = Range::new(start, end);
            expected = Some(expected.map_or(r, |e| e.join(&r)));
            assert_eq!(index.get_range_for_seqid("x").unwrap(), expected.unwrap());
        }
    }

    #[test]
    fn test_ids_and_removal() {
        let index = FeatureIndexMemory::new();
        let a = gene("s", 1, 100);
        let b = gene("s", 50, 150);
        index.add_feature_node(&a).unwrap();
        index.add_feature_node(&b).unwrap();
        // Same node twice is indexed once
        index.add_feature_node(&a).unwrap();
        assert_eq!(index.len().unwrap(), 2);

        let id_b = index.node_id(&b).unwrap().unwrap();
        assert!(Arc::ptr_eq(&index.get_node_by_id(id_b).unwrap(), &b));
        assert_ne!(index.node_id(&a).unwrap(), Some(id_b));

        index.remove_node(&a).unwrap();
        assert!(!index.contains_node(&a).unwrap());
        assert_eq!(index.node_id(&a).unwrap(), None);
        let hits = index.get_features_for_range("s", Range::new(1, 200)).unwrap();
        assert_eq!(hits.len(), 1);
        assert!(Arc::ptr_eq(&hits[0], &b));

        // Removing an unknown node is a no-op
        index.remove_node(&gene("s", 1, 100)).unwrap();
        assert_eq!(index.len().unwrap(), 1);
        assert!(matches!(
            index.get_node_by_id(999),
            Err(GfiError::NodeNotFound(999))
        ));
    }

    #[test]
    fn test_index_releases_nodes_on_drop() {
        let f = gene("s", 1, 10);
        {
            let index: Arc<dyn FeatureIndex> = Arc::new(FeatureIndexMemory::new());
            let handle = Arc::clone(&index);
            handle.add_feature_node(&f).unwrap();
            drop(handle);
            assert!(Arc::strong_count(&f) > 1);
            assert!(index.has_seqid("s").unwrap());
        }
        assert_eq!(Arc::strong_count(&f), 1);
    }

    #[test]
    fn test_children_are_not_indexed() {
        let index = FeatureIndexMemory::new();
        let gene = Arc::new(FeatureNode::standard_gene());
        index.add_feature_node(&gene).unwrap();
        assert_eq!(index.get_features_for_seqid("ctg123").unwrap().len(), 1);
        let hits = index
            .get_features_for_range("ctg123", Range::new(3000, 3100))
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].feature_type(), GENE);
    }
}

//! Maps requested nodes to repository sites.
//!
//! Weather nodes take the single nearest site. Generator nodes are filled
//! nearest-first from site capacity: each node receives a list of
//! (site, fraction-of-site-capacity) shares whose scaled capacities sum to
//! the node's requested capacity, and a site's capacity is never allocated
//! twice across nodes.

use crate::repository::ResourceRepository;
use crate::sites::error::LocateSiteError;
use crate::types::node::GeneratorNode;
use crate::types::resource::Dataset;
use crate::types::site::Site;
use bincode::config::{Configuration, Fixint, LittleEndian};
use haversine::{distance, Location as HaversineLocation, Units};
use ordered_float::OrderedFloat;
use rstar::RTree;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::path::Path;
use tracing::{debug, info};

const BINCODE_CONFIG: Configuration<LittleEndian, Fixint> =
    bincode::config::standard().with_fixed_int_encoding();

/// Leftover capacities below this many MW count as filled.
const CAPACITY_TOLERANCE_MW: f64 = 1e-9;

/// One site's contribution to a generator node.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteShare {
    pub site: Site,
    /// Fraction of the site's nameplate capacity assigned to the node.
    pub fraction: f64,
}

/// The sites serving one generator node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeAllocation {
    pub node_id: i64,
    pub shares: Vec<SiteShare>,
}

#[derive(Debug)]
pub struct SiteLocator {
    dataset: Dataset,
    rtree: RTree<Site>,
}

impl SiteLocator {
    /// Loads site metadata for a dataset, preferring the bincode cache next
    /// to the data cache and falling back to the repository.
    pub async fn new(
        dataset: Dataset,
        cache_dir: &Path,
        repository: &dyn ResourceRepository,
    ) -> Result<Self, LocateSiteError> {
        let cache_file = cache_dir.join(format!("{dataset}_sites.bin"));

        let sites: Vec<Site> = if cache_file.exists() {
            let path = cache_file.clone();
            tokio::task::spawn_blocking(move || {
                let bytes =
                    std::fs::read(&path).map_err(|e| LocateSiteError::CacheRead(path.clone(), e))?;
                let (sites, _) = bincode::serde::decode_from_slice::<Vec<Site>, _>(
                    &bytes,
                    BINCODE_CONFIG,
                )
                .map_err(|e| LocateSiteError::CacheDecode(path.clone(), Box::from(e)))?;
                Ok::<_, LocateSiteError>(sites)
            })
            .await??
        } else {
            debug!("no {dataset} site metadata cache; fetching from repository");
            let sites = repository.fetch_site_meta(dataset).await?;
            let encoded = tokio::task::spawn_blocking({
                let sites = sites.clone();
                move || {
                    bincode::serde::encode_to_vec(sites, BINCODE_CONFIG)
                        .map_err(|e| LocateSiteError::CacheEncode(Box::new(e)))
                }
            })
            .await??;
            tokio::fs::write(&cache_file, &encoded)
                .await
                .map_err(|e| LocateSiteError::CacheWrite(cache_file.clone(), e))?;
            info!(
                "cached {} {dataset} sites to {}",
                sites.len(),
                cache_file.display()
            );
            sites
        };

        if sites.is_empty() {
            return Err(LocateSiteError::NoSites { dataset });
        }
        Ok(Self::from_sites(dataset, sites))
    }

    pub(crate) fn from_sites(dataset: Dataset, sites: Vec<Site>) -> Self {
        Self {
            dataset,
            rtree: RTree::bulk_load(sites),
        }
    }

    pub fn dataset(&self) -> Dataset {
        self.dataset
    }

    /// The nearest site to a coordinate, with its haversine distance in km.
    pub fn nearest_site(&self, latitude: f64, longitude: f64) -> Option<(Site, f64)> {
        let site = self.rtree.nearest_neighbor(&[latitude, longitude])?;
        let km = distance(
            HaversineLocation {
                latitude,
                longitude,
            },
            HaversineLocation {
                latitude: site.latitude,
                longitude: site.longitude,
            },
            Units::Kilometers,
        );
        Some((site.clone(), km))
    }

    /// Fills each generator node's capacity from the nearest sites that
    /// still have unallocated capacity. Nodes are processed in input order.
    pub fn allocate(
        &self,
        nodes: &[GeneratorNode],
    ) -> Result<Vec<NodeAllocation>, LocateSiteError> {
        let by_id: HashMap<i64, &Site> = self.rtree.iter().map(|s| (s.id, s)).collect();
        let mut remaining_mw: HashMap<i64, f64> = by_id
            .values()
            .map(|site| (site.id, site.capacity_mw))
            .collect();

        let mut allocations = Vec::with_capacity(nodes.len());
        for generator in nodes {
            let mut heap: BinaryHeap<Reverse<(OrderedFloat<f64>, i64)>> = self
                .rtree
                .iter()
                .map(|site| {
                    let km = distance(
                        HaversineLocation {
                            latitude: generator.node.latitude,
                            longitude: generator.node.longitude,
                        },
                        HaversineLocation {
                            latitude: site.latitude,
                            longitude: site.longitude,
                        },
                        Units::Kilometers,
                    );
                    Reverse((OrderedFloat(km), site.id))
                })
                .collect();

            let mut need_mw = generator.capacity_mw;
            let mut shares: Vec<SiteShare> = Vec::new();
            while need_mw > CAPACITY_TOLERANCE_MW {
                let Some(Reverse((_, site_id))) = heap.pop() else {
                    return Err(LocateSiteError::InsufficientCapacity {
                        node_id: generator.node.id,
                        requested_mw: generator.capacity_mw,
                        allocated_mw: generator.capacity_mw - need_mw,
                    });
                };
                let site = by_id[&site_id];
                let available_mw = remaining_mw[&site_id];
                if available_mw <= CAPACITY_TOLERANCE_MW || site.capacity_mw <= 0.0 {
                    continue;
                }
                let taken_mw = need_mw.min(available_mw);
                shares.push(SiteShare {
                    site: site.clone(),
                    fraction: taken_mw / site.capacity_mw,
                });
                remaining_mw.insert(site_id, available_mw - taken_mw);
                need_mw -= taken_mw;
            }
            debug!(
                "node {} filled from {} site(s)",
                generator.node.id,
                shares.len()
            );
            allocations.push(NodeAllocation {
                node_id: generator.node.id,
                shares,
            });
        }
        Ok(allocations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing::FakeRepository;
    use crate::types::node::Node;
    use tempfile::TempDir;

    fn site(id: i64, lat: f64, capacity_mw: f64) -> Site {
        Site {
            id,
            latitude: lat,
            longitude: -105.0,
            capacity_mw,
        }
    }

    fn generator(id: i64, lat: f64, capacity_mw: f64) -> GeneratorNode {
        GeneratorNode {
            node: Node {
                id,
                latitude: lat,
                longitude: -105.0,
            },
            capacity_mw,
        }
    }

    #[test]
    fn nearest_site_uses_haversine_distance() {
        let locator = SiteLocator::from_sites(
            Dataset::Wind,
            vec![site(1, 40.0, 16.0), site(2, 42.0, 16.0)],
        );
        let (found, km) = locator.nearest_site(40.1, -105.0).unwrap();
        assert_eq!(found.id, 1);
        assert!(km > 0.0 && km < 20.0);
    }

    #[test]
    fn allocation_fills_capacity_from_nearest_sites() {
        let locator = SiteLocator::from_sites(
            Dataset::Wind,
            vec![site(1, 40.0, 10.0), site(2, 40.5, 10.0), site(3, 45.0, 50.0)],
        );
        let allocations = locator.allocate(&[generator(7, 40.0, 15.0)]).unwrap();

        let shares = &allocations[0].shares;
        assert_eq!(shares.len(), 2);
        assert_eq!(shares[0].site.id, 1);
        assert_eq!(shares[0].fraction, 1.0);
        assert_eq!(shares[1].site.id, 2);
        assert_eq!(shares[1].fraction, 0.5);

        let total_mw: f64 = shares
            .iter()
            .map(|share| share.fraction * share.site.capacity_mw)
            .sum();
        assert!((total_mw - 15.0).abs() < 1e-9);
    }

    #[test]
    fn sites_are_not_allocated_twice() {
        let locator =
            SiteLocator::from_sites(Dataset::Wind, vec![site(1, 40.0, 10.0), site(2, 41.0, 10.0)]);
        let allocations = locator
            .allocate(&[generator(1, 40.0, 10.0), generator(2, 40.0, 10.0)])
            .unwrap();

        // The first node consumed site 1 entirely, so the second node is
        // served from site 2 even though site 1 is closer.
        assert_eq!(allocations[0].shares[0].site.id, 1);
        assert_eq!(allocations[1].shares[0].site.id, 2);
        assert_eq!(allocations[1].shares[0].fraction, 1.0);
    }

    #[test]
    fn insufficient_capacity_is_an_error() {
        let locator = SiteLocator::from_sites(Dataset::Wind, vec![site(1, 40.0, 10.0)]);
        let err = locator.allocate(&[generator(1, 40.0, 25.0)]).unwrap_err();
        match err {
            LocateSiteError::InsufficientCapacity {
                node_id,
                requested_mw,
                allocated_mw,
            } => {
                assert_eq!(node_id, 1);
                assert_eq!(requested_mw, 25.0);
                assert_eq!(allocated_mw, 10.0);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn site_metadata_is_cached_across_locators() {
        let dir = TempDir::new().unwrap();
        let repo = FakeRepository::new(vec![site(1, 40.0, 16.0)]);

        let first = SiteLocator::new(Dataset::Wind, dir.path(), &repo)
            .await
            .unwrap();
        assert_eq!(repo.meta_fetch_count(), 1);
        assert!(first.nearest_site(40.0, -105.0).is_some());

        let second = SiteLocator::new(Dataset::Wind, dir.path(), &repo)
            .await
            .unwrap();
        assert_eq!(repo.meta_fetch_count(), 1);
        assert!(second.nearest_site(40.0, -105.0).is_some());
    }
}

use std::fmt;
use std::io;
use std::io::Write;

use crate::error::SimError;
use crate::geometry::Geometry;

/// One cache slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Line {
    pub valid: bool,
    pub tag: u64,
    /// Logical clock value of the last hit or fill, 0 while never filled.
    pub recency: u64,
}

impl Line {
    pub fn print(&self) -> String {
        format!(
            "tag: {:x}, valid: {}, recency: {}",
            self.tag, self.valid, self.recency
        )
    }
}

/// What a single access did to the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessOutcome {
    Hit,
    /// Miss filled into a previously invalid line.
    Miss,
    /// Miss that replaced the least recently used line of a full set.
    MissEviction { victim_tag: u64 },
}

/// Hit, miss and eviction totals, for a whole run or for a single record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounters {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl RunCounters {
    pub fn accesses(&self) -> u64 {
        self.hits + self.misses
    }

    pub fn miss_ratio(&self) -> f64 {
        if self.accesses() == 0 {
            return 0.0;
        }
        self.misses as f64 / self.accesses() as f64
    }

    pub(crate) fn record(&mut self, outcome: AccessOutcome) {
        match outcome {
            AccessOutcome::Hit => self.hits += 1,
            AccessOutcome::Miss => self.misses += 1,
            AccessOutcome::MissEviction { .. } => {
                self.misses += 1;
                self.evictions += 1;
            }
        }
    }
}

impl fmt::Display for RunCounters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hits:{} misses:{} evictions:{}",
            self.hits, self.misses, self.evictions
        )
    }
}

#[derive(Debug)]
pub struct CacheSet {
    lines: Vec<Line>,
}

impl CacheSet {
    fn new(associativity: usize) -> Result<CacheSet, SimError> {
        let mut lines = Vec::new();
        lines
            .try_reserve_exact(associativity)
            .map_err(|_| too_large())?;
        lines.resize(associativity, Line::default());
        Ok(CacheSet { lines })
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn valid_count(&self) -> usize {
        self.lines.iter().filter(|line| line.valid).count()
    }

    /// Look `tag` up in the set, filling or replacing a line on a miss.
    fn access(&mut self, tag: u64, clock: u64) -> AccessOutcome {
        // if the block is already in the set, refresh it
        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|line| line.valid && line.tag == tag)
        {
            line.recency = clock;
            return AccessOutcome::Hit;
        }

        if let Some(line) = self.lines.iter_mut().find(|line| !line.valid) {
            *line = Line {
                valid: true,
                tag,
                recency: clock,
            };
            return AccessOutcome::Miss;
        }

        let victim = self.lru_index();
        let line = &mut self.lines[victim];
        let victim_tag = line.tag;
        line.tag = tag;
        line.recency = clock;
        AccessOutcome::MissEviction { victim_tag }
    }

    /// Index of the least recently used line, lowest index on ties.
    fn lru_index(&self) -> usize {
        let mut victim = 0;
        for (index, line) in self.lines.iter().enumerate().skip(1) {
            if line.recency < self.lines[victim].recency {
                victim = index;
            }
        }
        victim
    }
}

/// Set-associative cache with LRU replacement.
#[derive(Debug)]
pub struct Cache {
    geometry: Geometry,
    sets: Vec<CacheSet>,
    /// Shared by every set; advances once per hit or fill.
    clock: u64,
}

impl Cache {
    pub fn new(geometry: Geometry) -> Result<Cache, SimError> {
        let mut sets = Vec::new();
        sets.try_reserve_exact(geometry.set_count())
            .map_err(|_| too_large())?;
        for _ in 0..geometry.set_count() {
            sets.push(CacheSet::new(geometry.associativity())?);
        }
        Ok(Cache {
            geometry,
            sets,
            clock: 0,
        })
    }

    pub fn set(&self, index: usize) -> Option<&CacheSet> {
        self.sets.get(index)
    }

    /// Simulate one load or store of `address`, recording the result in `counters`.
    pub fn access(&mut self, address: u64, counters: &mut RunCounters) -> AccessOutcome {
        let address = self.geometry.decompose(address);
        self.clock += 1;
        let outcome = self.sets[address.set_index].access(address.tag, self.clock);
        if let AccessOutcome::MissEviction { victim_tag } = outcome {
            tracing::debug!(
                "set {}: evicted tag {:x} for tag {:x}",
                address.set_index,
                victim_tag,
                address.tag
            );
        }
        counters.record(outcome);
        outcome
    }

    /// Write every set that holds at least one valid line.
    pub fn dump<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let valid: usize = self.sets.iter().map(CacheSet::valid_count).sum();
        writeln!(
            out,
            "----The cache status: clock: {}, valid lines: {} / {}",
            self.clock,
            valid,
            self.geometry.line_count()
        )?;

        for (index, set) in self
            .sets
            .iter()
            .enumerate()
            .filter(|(_, set)| set.valid_count() > 0)
        {
            writeln!(out, "*CacheSet index: {}", index)?;
            for line in set.lines.iter().filter(|line| line.valid) {
                writeln!(out, "{}", line.print())?;
            }
        }
        Ok(())
    }
}

fn too_large() -> SimError {
    SimError::Config("cache is too large to allocate".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(s: u32, e: usize, b: u32) -> Cache {
        Cache::new(Geometry::new(s, e, b).unwrap()).unwrap()
    }

    #[test]
    fn fresh_cache_is_empty() {
        let cache = cache(2, 3, 4);
        for index in 0..4 {
            assert_eq!(cache.set(index).unwrap().lines().len(), 3);
            assert_eq!(cache.set(index).unwrap().valid_count(), 0);
            assert!(cache.set(index).unwrap().lines().iter().all(|l| l.recency == 0));
        }
    }

    #[test]
    fn direct_mapped_conflict() {
        let mut cache = cache(0, 1, 0);
        let mut counters = RunCounters::default();
        assert_eq!(cache.access(0x0, &mut counters), AccessOutcome::Miss);
        assert_eq!(
            cache.access(0x1, &mut counters),
            AccessOutcome::MissEviction { victim_tag: 0 }
        );
        assert_eq!(
            counters,
            RunCounters {
                hits: 0,
                misses: 2,
                evictions: 1
            }
        );
    }

    #[test]
    fn lru_evicts_least_recently_used() {
        let mut cache = cache(0, 2, 0);
        let mut counters = RunCounters::default();
        let (a, b, c) = (0xa, 0xb, 0xc);
        assert_eq!(cache.access(a, &mut counters), AccessOutcome::Miss);
        assert_eq!(cache.access(b, &mut counters), AccessOutcome::Miss);
        assert_eq!(cache.access(a, &mut counters), AccessOutcome::Hit);
        assert_eq!(
            cache.access(c, &mut counters),
            AccessOutcome::MissEviction { victim_tag: b }
        );
        assert_eq!(cache.access(a, &mut counters), AccessOutcome::Hit);
    }

    #[test]
    fn fills_lowest_invalid_line_first() {
        let mut cache = cache(1, 4, 2);
        let mut counters = RunCounters::default();
        // set 1, tags 1 and 2
        cache.access(0b1_1_00, &mut counters);
        cache.access(0b10_1_00, &mut counters);

        let lines = cache.set(1).unwrap().lines();
        assert_eq!((lines[0].valid, lines[0].tag), (true, 1));
        assert_eq!((lines[1].valid, lines[1].tag), (true, 2));
        assert!(!lines[2].valid && !lines[3].valid);
        assert!(lines[0].recency < lines[1].recency);
        assert_eq!(cache.set(0).unwrap().valid_count(), 0);
    }

    #[test]
    fn lru_index_breaks_ties_by_position() {
        let mut set = CacheSet::new(3).unwrap();
        for line in set.lines.iter_mut() {
            line.valid = true;
            line.recency = 7;
        }
        set.lines[0].recency = 9;
        assert_eq!(set.lru_index(), 1);
    }

    #[test]
    fn hit_refreshes_recency() {
        let mut cache = cache(0, 2, 0);
        let mut counters = RunCounters::default();
        cache.access(1, &mut counters);
        cache.access(2, &mut counters);
        let before = cache.set(0).unwrap().lines()[0].recency;
        cache.access(1, &mut counters);
        let after = cache.set(0).unwrap().lines()[0].recency;
        assert!(after > cache.set(0).unwrap().lines()[1].recency);
        assert!(after > before);
    }

    #[test]
    fn same_block_different_offsets_hit() {
        let mut cache = cache(2, 1, 4);
        let mut counters = RunCounters::default();
        cache.access(0x100, &mut counters);
        assert_eq!(cache.access(0x10f, &mut counters), AccessOutcome::Hit);
    }

    #[test]
    fn miss_ratio_of_nothing_is_zero() {
        assert_eq!(RunCounters::default().miss_ratio(), 0.0);
        let counters = RunCounters {
            hits: 3,
            misses: 1,
            evictions: 0,
        };
        assert_eq!(counters.miss_ratio(), 0.25);
        assert_eq!(counters.to_string(), "hits:3 misses:1 evictions:0");
    }

    #[test]
    fn set_lookup_out_of_range_is_none() {
        let cache = cache(2, 1, 0);
        assert!(cache.set(3).is_some());
        assert!(cache.set(4).is_none());
        assert!(cache.set(usize::MAX).is_none());
    }

    #[test]
    fn dump_lists_occupied_sets() {
        let mut cache = cache(1, 1, 0);
        let mut counters = RunCounters::default();
        cache.access(0x3, &mut counters);
        let mut out: Vec<u8> = Vec::new();
        cache.dump(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("valid lines: 1 / 2"));
        assert!(text.contains("*CacheSet index: 1"));
        assert!(!text.contains("*CacheSet index: 0"));
        assert!(text.contains("tag: 1, valid: true"));
    }
}

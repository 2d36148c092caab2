//! Name resolution: string -> enumerated index, O(1) expected.
//!
//! Element, attribute and enumeration names are resolved through a minimal
//! perfect hash: two salted, position-weighted byte sums combined through a
//! displacement table. The hash only narrows the input to a candidate
//! index; membership is always confirmed with an equality check. Small name
//! sets skip the hash entirely and use a linear scan.

use crate::err::SchemaError;

/// Name sets below this size are scanned linearly; the constant-factor win
/// of the hash only pays off past this point.
const HASH_LOOKUP_THRESHOLD: usize = 8;

const MAX_TRIALS: u64 = 4000;

/// An immutable name set with O(1) expected lookup.
#[derive(Debug, Clone)]
pub(crate) struct NameTable {
    names: Vec<Box<str>>,
    strategy: Strategy,
}

#[derive(Debug, Clone)]
enum Strategy {
    Linear,
    Hashed(DisplacementHash),
}

impl NameTable {
    /// Compile a lookup table for `names`. The input order defines the
    /// index each name resolves to.
    pub(crate) fn new(names: Vec<String>) -> Result<Self, SchemaError> {
        let strategy = if names.len() < HASH_LOOKUP_THRESHOLD {
            Strategy::Linear
        } else {
            Strategy::Hashed(DisplacementHash::generate(&names)?)
        };
        Ok(NameTable {
            names: names.into_iter().map(String::into_boxed_str).collect(),
            strategy,
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.names.len()
    }

    /// Resolve `key` to its index, or `None` for names outside the set.
    pub(crate) fn resolve(&self, key: &str) -> Option<usize> {
        match &self.strategy {
            Strategy::Linear => self.names.iter().position(|n| n.as_ref() == key),
            Strategy::Hashed(hash) => {
                let candidate = hash.candidate(key.as_bytes());
                // The hash narrows to a candidate only; it does not prove
                // membership.
                (candidate < self.names.len() && self.names[candidate].as_ref() == key)
                    .then_some(candidate)
            }
        }
    }
}

/// Two salted byte sums `f1`, `f2` plus a displacement table `g`:
/// `candidate = (g[f1 % L] + g[f2 % L]) % L`.
#[derive(Debug, Clone)]
pub(crate) struct DisplacementHash {
    salt1: Vec<u32>,
    salt2: Vec<u32>,
    g: Vec<u32>,
}

impl DisplacementHash {
    pub(crate) fn candidate(&self, key: &[u8]) -> usize {
        let len = self.g.len() as u64;
        let mut f1: u64 = 0;
        let mut f2: u64 = 0;
        for (i, &b) in key.iter().take(self.salt1.len()).enumerate() {
            f1 += u64::from(self.salt1[i]) * u64::from(b);
            f2 += u64::from(self.salt2[i]) * u64::from(b);
        }
        let g1 = u64::from(self.g[(f1 % len) as usize]);
        let g2 = u64::from(self.g[(f2 % len) as usize]);
        ((g1 + g2) % len) as usize
    }

    /// Construct a perfect hash with the acyclic-graph method: each key
    /// becomes an edge between vertices `f1` and `f2`; if the resulting
    /// graph is acyclic, displacements can be assigned so that every key
    /// hashes to its own index. Salts are retried (and the table grown)
    /// until an acyclic graph is found.
    fn generate(names: &[String]) -> Result<Self, SchemaError> {
        let salt_len = names.iter().map(|n| n.len()).max().unwrap_or(1).max(1);

        for trial in 0..MAX_TRIALS {
            // Grow the vertex count slowly; most sets succeed near the
            // minimum size.
            let size = names.len() + 1 + (trial / 16) as usize;
            let mut rng = SplitMix64::new(0x9e37_79b9 ^ trial);
            let salt1: Vec<u32> = (0..salt_len).map(|_| rng.below(255) + 1).collect();
            let salt2: Vec<u32> = (0..salt_len).map(|_| rng.below(255) + 1).collect();

            let hash = DisplacementHash {
                salt1,
                salt2,
                g: vec![0; size],
            };
            if let Some(done) = hash.assign(names) {
                debug_assert!(names
                    .iter()
                    .enumerate()
                    .all(|(i, n)| done.candidate(n.as_bytes()) == i));
                return Ok(done);
            }
        }

        Err(SchemaError::HashConstruction(names.len()))
    }

    /// Try to assign displacements for the current salts. Returns `None`
    /// when the key graph contains a cycle (including duplicate edges and
    /// self-loops).
    fn assign(mut self, names: &[String]) -> Option<Self> {
        let size = self.g.len();
        let len = size as u64;

        let mut edges: Vec<Vec<(usize, usize)>> = vec![Vec::new(); size];
        for (index, name) in names.iter().enumerate() {
            let mut f1: u64 = 0;
            let mut f2: u64 = 0;
            for (i, &b) in name.as_bytes().iter().take(self.salt1.len()).enumerate() {
                f1 += u64::from(self.salt1[i]) * u64::from(b);
                f2 += u64::from(self.salt2[i]) * u64::from(b);
            }
            let u = (f1 % len) as usize;
            let v = (f2 % len) as usize;
            if u == v {
                return None;
            }
            edges[u].push((v, index));
            edges[v].push((u, index));
        }

        let mut assigned = vec![false; size];
        let mut stack = Vec::new();
        for start in 0..size {
            if assigned[start] {
                continue;
            }
            assigned[start] = true;
            self.g[start] = 0;
            // (vertex, edge index used to reach it) — skipping that edge on
            // the way back distinguishes the tree edge from a cycle.
            stack.push((start, usize::MAX));
            while let Some((u, via)) = stack.pop() {
                for (edge_i, &(v, key)) in edges[u].iter().enumerate() {
                    if edge_i == via {
                        continue;
                    }
                    let want = (key as u64 + len - u64::from(self.g[u])) % len;
                    if assigned[v] {
                        if u64::from(self.g[v]) != want {
                            return None;
                        }
                        continue;
                    }
                    assigned[v] = true;
                    self.g[v] = want as u32;
                    let back = edges[v].iter().position(|&(w, k)| w == u && k == key);
                    stack.push((v, back.unwrap_or(usize::MAX)));
                }
            }
        }

        Some(self)
    }
}

/// Deterministic salt generator; reproducible schema compilation without an
/// RNG dependency.
struct SplitMix64(u64);

impl SplitMix64 {
    fn new(seed: u64) -> Self {
        SplitMix64(seed.wrapping_mul(0x2545_f491_4f6c_dd1d) | 1)
    }

    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }

    fn below(&mut self, bound: u32) -> u32 {
        (self.next() % u64::from(bound)) as u32
    }
}

use std::collections::HashMap;

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    total: usize,
    taken: usize,
}

/// Observed identifiers with multiplicity. Each `take` consumes one
/// occurrence; whatever was never taken is handed back in observation order.
#[derive(Debug, Default)]
pub(crate) struct Multiset<'a> {
    counts: HashMap<&'a str, Tally>,
}

impl<'a> Multiset<'a> {
    pub(crate) fn new<I>(items: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut counts: HashMap<&'a str, Tally> = HashMap::new();
        for item in items {
            counts.entry(item).or_default().total += 1;
        }
        Self { counts }
    }

    /// Consume one occurrence of `key`. False when none is left.
    pub(crate) fn take(&mut self, key: &str) -> bool {
        match self.counts.get_mut(key) {
            Some(t) if t.taken < t.total => {
                t.taken += 1;
                true
            }
            _ => false,
        }
    }

    /// Occurrences never taken, in the order of `observed`. Taken occurrences
    /// are matched against the earliest positions first.
    pub(crate) fn leftovers<I>(mut self, observed: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut out = Vec::new();
        for item in observed {
            match self.counts.get_mut(item) {
                Some(t) if t.taken > 0 => t.taken -= 1,
                _ => out.push(item.to_string()),
            }
        }
        out
    }
}

use normalize::NormalizedRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use crate::config::{BlockingStrategy, ResolutionConfig};

/// Key used when every record lands in one block
pub const FULL_COMPARISON_KEY: &str = "*";

/// A set of records compared pairwise. Members are positions in the run
/// context, ordered by folded name then id.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub key: String,
    pub members: Vec<usize>,
    /// When set, members are only compared with their next `window - 1` neighbours
    pub window: Option<usize>,
}

impl Block {
    fn reach(&self) -> usize {
        self.window.unwrap_or(self.members.len()).max(1)
    }

    /// Pairs whose first member sits at index `i` of the block
    pub fn row(&self, i: usize) -> impl Iterator<Item = (usize, usize)> + '_ {
        let end = self.members.len().min(i.saturating_add(self.reach()));
        ((i + 1)..end).map(move |j| (self.members[i], self.members[j]))
    }

    /// Candidate pairs of this block, as positions, produced lazily
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.members.len()).flat_map(move |i| self.row(i))
    }

    pub fn pair_count(&self) -> usize {
        let n = self.members.len();
        let reach = self.reach();
        (0..n).map(|i| n.min(i.saturating_add(reach)).saturating_sub(i + 1)).sum()
    }
}

/// Reported when a block outgrows `max_block_size`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityWarning {
    pub block_key: String,
    pub block_size: usize,
    pub limit: usize,
    pub suggestion: String,
}

#[derive(Debug, Clone, Default)]
pub struct BlockPlan {
    pub blocks: Vec<Block>,
    /// Records with no blocking key (unknown name); always singletons
    pub unblocked: Vec<usize>,
    pub warnings: Vec<CapacityWarning>,
}

/// Partition records into blocks. Deterministic for a given strategy:
/// blocks come out ordered by key.
pub fn plan_blocks(records: &[NormalizedRecord], config: &ResolutionConfig) -> BlockPlan {
    let full_comparison = config.blocking_strategy == BlockingStrategy::None
        || records.len() < config.full_comparison_below;

    let mut keyed: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    let mut plan = BlockPlan::default();

    for (pos, record) in records.iter().enumerate() {
        let key = if record.name_is_unknown() {
            None
        } else if full_comparison {
            Some(FULL_COMPARISON_KEY.to_string())
        } else {
            blocking_key(record, config.blocking_strategy)
        };

        match key {
            Some(key) => keyed.entry(key).or_default().push(pos),
            None => plan.unblocked.push(pos),
        }
    }

    for (key, mut members) in keyed {
        members.sort_by(|&x, &y| {
            records[x]
                .folded_name
                .cmp(&records[y].folded_name)
                .then_with(|| records[x].id.cmp(&records[y].id))
        });

        let mut window = None;
        if members.len() > config.max_block_size {
            let warning = CapacityWarning {
                suggestion: suggest_stricter(config.blocking_strategy, full_comparison),
                block_key: key.clone(),
                block_size: members.len(),
                limit: config.max_block_size,
            };
            warn!(
                block_key = %warning.block_key,
                block_size = warning.block_size,
                limit = warning.limit,
                suggestion = %warning.suggestion,
                "Block exceeds capacity; comparing within a sorted window"
            );
            plan.warnings.push(warning);
            window = Some(config.max_block_size);
        }

        plan.blocks.push(Block { key, members, window });
    }

    plan
}

fn suggest_stricter(strategy: BlockingStrategy, full_comparison: bool) -> String {
    if full_comparison && strategy != BlockingStrategy::None {
        return format!(
            "lower full_comparison_below so the `{}` blocking key applies",
            strategy.as_str()
        );
    }
    match strategy.stricter() {
        Some(stricter) => format!("use the `{}` blocking strategy", stricter.as_str()),
        None => "raise max_block_size or pre-filter records by birth year".to_string(),
    }
}

pub fn blocking_key(record: &NormalizedRecord, strategy: BlockingStrategy) -> Option<String> {
    let first = record.first_token()?;
    match strategy {
        BlockingStrategy::FirstToken => Some(first.to_string()),
        // Soundex only covers Latin letters; other scripts block on the token itself
        BlockingStrategy::Phonetic => soundex(first).or_else(|| Some(first.to_string())),
        BlockingStrategy::None => Some(FULL_COMPARISON_KEY.to_string()),
    }
}

/// American Soundex: first letter plus three digits ("robert" -> "R163")
pub fn soundex(token: &str) -> Option<String> {
    let mut letters = token
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_lowercase());

    let first = letters.next()?;
    let mut code = String::with_capacity(4);
    code.push(first.to_ascii_uppercase());

    let mut last = soundex_digit(first);
    for c in letters {
        // h and w do not separate letters with the same code
        if c == 'h' || c == 'w' {
            continue;
        }
        let digit = soundex_digit(c);
        if digit != 0 && digit != last {
            code.push(char::from(b'0' + digit));
            if code.len() == 4 {
                break;
            }
        }
        last = digit;
    }

    while code.len() < 4 {
        code.push('0');
    }
    Some(code)
}

fn soundex_digit(c: char) -> u8 {
    match c {
        'b' | 'f' | 'p' | 'v' => 1,
        'c' | 'g' | 'j' | 'k' | 'q' | 's' | 'x' | 'z' => 2,
        'd' | 't' => 3,
        'l' => 4,
        'm' | 'n' => 5,
        'r' => 6,
        _ => 0,
    }
}

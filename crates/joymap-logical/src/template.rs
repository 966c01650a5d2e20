use joymap_input::{ButtonId, DeviceInfo, Part};

/// 16-bit logical button mask of a player.
pub type LogicalMask = u16;

/// Number of logical button bits.
pub const LOGICAL_BITS: usize = 16;

/// Device identity a template applies to. Zero or empty fields match
/// anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Matcher {
    pub vendor_id: u16,
    pub product_id: u16,
    pub version: u16,
    pub name: String,
}

impl Matcher {
    /// Matcher pinned to every identity field of a device.
    pub fn from_info(info: &DeviceInfo) -> Self {
        Self {
            vendor_id: info.vendor_id,
            product_id: info.product_id,
            version: info.version,
            name: info.name.chars().map(single_line).collect(),
        }
    }

    pub fn matches(&self, info: &DeviceInfo) -> bool {
        (self.vendor_id == 0 || self.vendor_id == info.vendor_id)
            && (self.product_id == 0 || self.product_id == info.product_id)
            && (self.version == 0 || self.version == info.version)
            && (self.name.is_empty() || self.name.chars().eq(info.name.chars().map(single_line)))
    }
}

/// Names are stored one per line.
fn single_line(c: char) -> char {
    if matches!(c, '\n' | '\r') {
        ' '
    } else {
        c
    }
}

/// Maps one `(source button, part)` pair to logical bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonRule {
    pub source: ButtonId,
    pub part: Part,
    pub mask: LogicalMask,
}

impl ButtonRule {
    pub const fn new(source: ButtonId, part: Part, mask: LogicalMask) -> Self {
        Self { source, part, mask }
    }

    pub const fn key(&self) -> (ButtonId, Part) {
        (self.source, self.part)
    }
}

/// Mapping from a device's physical controls to logical bits.
///
/// Rules are kept ordered by `(source, part)` and each pair appears once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Template {
    pub matcher: Matcher,
    rules: Vec<ButtonRule>,
}

impl Template {
    pub fn new(matcher: Matcher) -> Self {
        Self { matcher, rules: Vec::new() }
    }

    pub fn rules(&self) -> &[ButtonRule] {
        &self.rules
    }

    pub fn rule(&self, source: ButtonId, part: Part) -> Option<&ButtonRule> {
        self.rules
            .binary_search_by(|r| r.key().cmp(&(source, part)))
            .ok()
            .map(|i| &self.rules[i])
    }

    /// Insert a rule in order. Returns false if the pair is already mapped.
    pub fn insert(&mut self, rule: ButtonRule) -> bool {
        match self.rules.binary_search_by(|r| r.key().cmp(&rule.key())) {
            Ok(_) => false,
            Err(pos) => {
                self.rules.insert(pos, rule);
                true
            }
        }
    }

    /// OR `mask` into the rule for the pair, creating it if needed.
    pub fn merge(&mut self, source: ButtonId, part: Part, mask: LogicalMask) {
        if mask == 0 {
            return;
        }
        match self.rules.binary_search_by(|r| r.key().cmp(&(source, part))) {
            Ok(i) => self.rules[i].mask |= mask,
            Err(pos) => self.rules.insert(pos, ButtonRule::new(source, part, mask)),
        }
    }

    pub fn matches(&self, info: &DeviceInfo) -> bool {
        self.matcher.matches(info)
    }
}

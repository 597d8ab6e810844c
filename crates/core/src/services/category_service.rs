/// Icon key used for labels the table doesn't know.
pub const FALLBACK_ICON: &str = "CircleDollarSign";
/// Neutral gray used for labels without a dedicated color.
pub const FALLBACK_COLOR: &str = "#999999";

/// (label, icon key, color) for every known category label.
const CATEGORY_TABLE: &[(&str, &str, &str)] = &[
    ("Housing", "Home", "#41B883"),
    ("Groceries", "ShoppingCart", FALLBACK_COLOR),
    ("Food", "Pizza", "#FF6384"),
    ("Transportation", "Car", "#E46651"),
    ("Dining Out", "Utensils", FALLBACK_COLOR),
    ("Entertainment", "Film", "#4BC0C0"),
    ("Utilities", "Monitor", FALLBACK_COLOR),
    ("Travel", "Globe", "#FFCE56"),
    ("Bills", "FileText", "#36A2EB"),
    ("Healthcare", "HeartPulse", "#00D8FF"),
    ("Education", "BookOpen", "#DD1B16"),
    ("Shopping", "ShoppingBag", "#9966FF"),
    ("Other", "HelpCircle", "#FF9F40"),
];

/// Maps a category label to its display icon key and color.
///
/// Total and stateless: labels are matched exactly (case-sensitive) and
/// anything unknown resolves to [`FALLBACK_ICON`] / [`FALLBACK_COLOR`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CategoryService;

impl CategoryService {
    pub fn new() -> Self {
        Self
    }

    /// `(icon_key, color_hex)` for a label.
    pub fn classify(&self, category: &str) -> (&'static str, &'static str) {
        (self.icon_for(category), self.color_for(category))
    }

    pub fn icon_for(&self, category: &str) -> &'static str {
        Self::lookup(category).map_or(FALLBACK_ICON, |(_, icon, _)| icon)
    }

    pub fn color_for(&self, category: &str) -> &'static str {
        Self::lookup(category).map_or(FALLBACK_COLOR, |(_, _, color)| color)
    }

    /// All labels with a dedicated entry.
    pub fn known_categories(&self) -> impl Iterator<Item = &'static str> {
        CATEGORY_TABLE.iter().map(|(label, _, _)| *label)
    }

    fn lookup(category: &str) -> Option<&'static (&'static str, &'static str, &'static str)> {
        CATEGORY_TABLE.iter().find(|(label, _, _)| *label == category)
    }
}

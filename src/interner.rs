/// Category Dictionary for FlightDash
///
/// A category dictionary stores each distinct label of a categorical column
/// once and hands out integer IDs. Categorical columns keep one ID per row,
/// which makes equality filters and group-by keys integer comparisons.
///
/// # Design
///
/// - Labels are stored once in a `Vec<String>`; the index is the ID
/// - A `HashMap<String, CategoryId>` provides O(1) lookup from label to ID
/// - ID order is the domain order: first-seen order for loaded columns,
///   declaration order for bin labels
/// - An ordered dictionary (bin labels) sorts by ID; an unordered one sorts
///   by label
/// - Derived tables share their parent's dictionary through an `Arc`, so a
///   filtered view keeps the full category domain of its source
///
/// # Examples
///
/// ```
/// use flightdash::CategoryDictionary;
///
/// let mut dict = CategoryDictionary::new();
///
/// let economy = dict.intern("Economy");
/// let business = dict.intern("Business");
/// assert_eq!(dict.intern("Economy"), economy);
/// assert_ne!(economy, business);
///
/// assert_eq!(dict.resolve(economy), Some("Economy"));
/// assert_eq!(dict.lookup_ignore_case("business"), Some(business));
/// ```

use std::collections::HashMap;

/// Category ID type
pub type CategoryId = u32;

/// An ordered dictionary of category labels
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryDictionary {
    label_to_id: HashMap<String, CategoryId>,
    /// Labels by ID (index = ID)
    id_to_label: Vec<String>,
    /// Whether ID order is a meaningful sort order
    ordered: bool,
}

impl CategoryDictionary {
    /// Create a new empty dictionary
    pub fn new() -> Self {
        CategoryDictionary {
            label_to_id: HashMap::new(),
            id_to_label: Vec::new(),
            ordered: false,
        }
    }

    /// Create a dictionary with a fixed, ordered domain.
    ///
    /// Duplicate labels collapse onto their first position.
    pub fn with_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut dict = CategoryDictionary::new();
        for label in labels {
            dict.intern(label.as_ref());
        }
        dict
    }

    /// Create an ordered dictionary: labels sort by position, not text
    pub fn ordered<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut dict = Self::with_labels(labels);
        dict.ordered = true;
        dict
    }

    /// Returns true when ID order is the sort order of the domain
    pub fn is_ordered(&self) -> bool {
        self.ordered
    }

    /// Intern a label, returning its ID.
    /// Existing labels keep their ID; new labels are appended to the domain.
    pub fn intern(&mut self, label: &str) -> CategoryId {
        if let Some(&id) = self.label_to_id.get(label) {
            return id;
        }

        let id = self.id_to_label.len() as CategoryId;
        self.id_to_label.push(label.to_string());
        self.label_to_id.insert(label.to_string(), id);
        id
    }

    /// Exact lookup of a label's ID
    pub fn lookup(&self, label: &str) -> Option<CategoryId> {
        self.label_to_id.get(label).copied()
    }

    /// Case-insensitive lookup. The first label in domain order wins when
    /// several labels differ only by case.
    pub fn lookup_ignore_case(&self, label: &str) -> Option<CategoryId> {
        let wanted = label.to_lowercase();
        self.id_to_label
            .iter()
            .position(|l| l.to_lowercase() == wanted)
            .map(|pos| pos as CategoryId)
    }

    /// All IDs whose label equals `label` ignoring case
    pub fn matching_ignore_case(&self, label: &str) -> Vec<CategoryId> {
        let wanted = label.to_lowercase();
        self.id_to_label
            .iter()
            .enumerate()
            .filter(|(_, l)| l.to_lowercase() == wanted)
            .map(|(i, _)| i as CategoryId)
            .collect()
    }

    /// Resolve an ID back to its label
    pub fn resolve(&self, id: CategoryId) -> Option<&str> {
        self.id_to_label.get(id as usize).map(|s| s.as_str())
    }

    /// Number of labels in the domain
    pub fn len(&self) -> usize {
        self.id_to_label.len()
    }

    /// Returns true if the domain is empty
    pub fn is_empty(&self) -> bool {
        self.id_to_label.is_empty()
    }

    /// Labels in domain order
    pub fn labels(&self) -> impl Iterator<Item = &str> + '_ {
        self.id_to_label.iter().map(|s| s.as_str())
    }
}

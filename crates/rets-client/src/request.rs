//! Parameters of Search and GetObject transactions

/// A DMQL2 search
///
/// ```
/// use rets_client::SearchRequest;
///
/// let request = SearchRequest::new("Property", "RES", "(ListPrice=300000+)")
///     .select(["ListingID", "City", "ListPrice"])
///     .limit(50);
/// let params = request.params("COMPACT");
/// assert_eq!(params[0], ("SearchType".to_string(), "Property".to_string()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub search_type: String,
    pub class: String,
    pub query: String,
    /// Extra parameters; a name matching a required one replaces it
    pub options: Vec<(String, String)>,
}

impl SearchRequest {
    pub fn new(
        search_type: impl Into<String>,
        class: impl Into<String>,
        query: impl Into<String>,
    ) -> Self {
        Self {
            search_type: search_type.into(),
            class: class.into(),
            query: query.into(),
            options: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_option(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.options.push((name.into(), value.to_string()));
        self
    }

    /// Restrict the returned columns (`Select`)
    #[must_use]
    pub fn select<I, S>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let fields: Vec<String> = fields.into_iter().map(|f| f.as_ref().to_string()).collect();
        self.with_option("Select", fields.join(","))
    }

    /// Cap the number of rows (`Limit`)
    #[must_use]
    pub fn limit(self, limit: u32) -> Self {
        self.with_option("Limit", limit)
    }

    /// Request parameters in wire order
    ///
    /// `SearchType`, `Class`, `Query`, `QueryType=DMQL2`, `Format` and
    /// `Count=0`, then the options. An option named like an earlier
    /// parameter overrides it in place.
    pub fn params(&self, format: &str) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = [
            ("SearchType", self.search_type.as_str()),
            ("Class", self.class.as_str()),
            ("Query", self.query.as_str()),
            ("QueryType", "DMQL2"),
            ("Format", format),
            ("Count", "0"),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();

        for (name, value) in &self.options {
            match params.iter_mut().find(|(existing, _)| existing == name) {
                Some(entry) => entry.1.clone_from(value),
                None => params.push((name.clone(), value.clone())),
            }
        }
        params
    }
}

/// A GetObject request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRequest {
    pub resource: String,
    /// Object type, e.g. `Photo`
    pub object_type: String,
    /// `entity:object[:object...]`, e.g. `1001:*` or `1001:1:2`
    pub id: String,
    /// Ask for URLs instead of object data
    pub location: bool,
}

impl ObjectRequest {
    pub fn new(
        resource: impl Into<String>,
        object_type: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        Self {
            resource: resource.into(),
            object_type: object_type.into(),
            id: id.into(),
            location: false,
        }
    }

    #[must_use]
    pub fn with_location(mut self, location: bool) -> Self {
        self.location = location;
        self
    }

    pub fn params(&self) -> Vec<(String, String)> {
        vec![
            ("Resource".to_string(), self.resource.clone()),
            ("Type".to_string(), self.object_type.clone()),
            ("ID".to_string(), self.id.clone()),
            (
                "Location".to_string(),
                if self.location { "1" } else { "0" }.to_string(),
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pairs(params: &[(String, String)]) -> Vec<(&str, &str)> {
        params
            .iter()
            .map(|(n, v)| (n.as_str(), v.as_str()))
            .collect()
    }

    #[test]
    fn test_search_params() {
        let request = SearchRequest::new("Property", "RES", "(City=Springfield)");
        assert_eq!(
            pairs(&request.params("COMPACT-DECODED")),
            vec![
                ("SearchType", "Property"),
                ("Class", "RES"),
                ("Query", "(City=Springfield)"),
                ("QueryType", "DMQL2"),
                ("Format", "COMPACT-DECODED"),
                ("Count", "0"),
            ]
        );
    }

    #[test]
    fn test_options_override_in_place() {
        let request = SearchRequest::new("Property", "RES", "(City=Springfield)")
            .with_option("Count", 1)
            .select(["ListingID", "City"])
            .limit(10);
        let params = request.params("COMPACT");

        assert_eq!(params.len(), 8);
        assert_eq!(params[5], ("Count".to_string(), "1".to_string()));
        assert_eq!(params[6], ("Select".to_string(), "ListingID,City".to_string()));
        assert_eq!(params[7], ("Limit".to_string(), "10".to_string()));
    }

    #[test]
    fn test_object_params() {
        let request = ObjectRequest::new("Property", "Photo", "1001:*").with_location(true);
        assert_eq!(
            pairs(&request.params()),
            vec![
                ("Resource", "Property"),
                ("Type", "Photo"),
                ("ID", "1001:*"),
                ("Location", "1"),
            ]
        );
    }
}

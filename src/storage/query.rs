//! Filter queries over stored actors
//!
//! A filter group is written as a URL query string, e.g.
//! `name=Morgan&movies=Se7en,Invictus`. Conditions inside a group are ANDed;
//! several groups are ORed.

use rusqlite::types::Value;

/// Half-width of the window a `total_gross` filter matches within
pub const GROSS_RANGE: f64 = 5000.0;

/// One group of ANDed actor conditions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActorFilter {
    /// Case-insensitive substring of the actor name
    pub name: Option<String>,
    /// Exact age
    pub age: Option<u32>,
    /// Substring of the page URL
    pub url: Option<String>,
    /// Sum of linked movies' income, matched within [`GROSS_RANGE`]
    pub total_gross: Option<f64>,
    /// Each entry must be a substring of some linked movie's name
    pub movies: Vec<String>,
}

impl ActorFilter {
    /// Parses a query string into a filter group
    ///
    /// Unknown keys are ignored, as are `age` and `total_gross` values that are
    /// not numbers. `movie` names a single movie and takes precedence over the
    /// comma separated `movies`.
    ///
    /// # Examples
    ///
    /// ```
    /// use castnet::storage::ActorFilter;
    ///
    /// let filter = ActorFilter::parse("name=Freeman&age=eighty&movies=Se7en, Invictus");
    /// assert_eq!(filter.name.as_deref(), Some("Freeman"));
    /// assert_eq!(filter.age, None);
    /// assert_eq!(filter.movies, vec!["Se7en", "Invictus"]);
    /// ```
    pub fn parse(query: &str) -> Self {
        let mut filter = Self::default();
        let mut single_movie = None;
        let mut movie_list = None;

        for (key, value) in url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
            match key.as_ref() {
                "name" => filter.name = Some(value.into_owned()),
                "age" => filter.age = value.trim().parse().ok(),
                "url" | "wiki_page" => filter.url = Some(value.into_owned()),
                "total_gross" => {
                    filter.total_gross = value.trim().parse::<f64>().ok().filter(|g| g.is_finite())
                }
                "movie" => single_movie = Some(value.trim().to_string()),
                "movies" => {
                    movie_list = Some(value.split(',').map(|m| m.trim().to_string()).collect::<Vec<_>>())
                }
                other => tracing::debug!("Ignoring unknown filter key {:?}", other),
            }
        }

        filter.movies = match (single_movie, movie_list) {
            (Some(movie), _) => vec![movie],
            (None, Some(list)) => list,
            (None, None) => Vec::new(),
        };
        filter.movies.retain(|m| !m.is_empty());

        filter
    }

    /// True when the group places no condition and matches every actor
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.age.is_none()
            && self.url.is_none()
            && self.total_gross.is_none()
            && self.movies.is_empty()
    }

    /// SQL condition over the `actors` table aliased as `a`
    fn condition(&self, params: &mut Vec<Value>) -> String {
        let mut clauses = Vec::new();

        if let Some(name) = &self.name {
            params.push(Value::Text(name.clone()));
            clauses.push(format!("instr(lower(a.name), lower(?{})) > 0", params.len()));
        }

        if let Some(age) = self.age {
            params.push(Value::Integer(i64::from(age)));
            clauses.push(format!("a.age = ?{}", params.len()));
        }

        if let Some(url) = &self.url {
            params.push(Value::Text(url.clone()));
            clauses.push(format!("instr(a.url, ?{}) > 0", params.len()));
        }

        if let Some(gross) = self.total_gross {
            params.push(Value::Real(gross - GROSS_RANGE));
            let low = params.len();
            params.push(Value::Real(gross + GROSS_RANGE));
            let high = params.len();
            clauses.push(format!(
                "(SELECT COALESCE(SUM(m.income), 0) FROM edges e JOIN movies m ON m.url = e.movie_url \
                 WHERE e.actor_url = a.url) BETWEEN ?{} AND ?{}",
                low, high
            ));
        }

        for movie in &self.movies {
            params.push(Value::Text(movie.clone()));
            clauses.push(format!(
                "EXISTS (SELECT 1 FROM edges e JOIN movies m ON m.url = e.movie_url \
                 WHERE e.actor_url = a.url AND instr(lower(m.name), lower(?{})) > 0)",
                params.len()
            ));
        }

        if clauses.is_empty() {
            "1".to_string()
        } else {
            clauses.join(" AND ")
        }
    }
}

/// WHERE condition matching any of the groups; no groups match everything
pub(crate) fn any_of(filters: &[ActorFilter], params: &mut Vec<Value>) -> String {
    if filters.is_empty() {
        return "1".to_string();
    }

    filters
        .iter()
        .map(|filter| format!("({})", filter.condition(params)))
        .collect::<Vec<_>>()
        .join(" OR ")
}

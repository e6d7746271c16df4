//! Query building over the active snapshot's schema.
//!
//! The query language itself belongs to the engine; this module only
//! resolves default fields, applies ranking boosts and combines an optional
//! filter as a must clause.

use tantivy::query::{BooleanQuery, Occur, Query, QueryParser};
use tantivy::schema::Schema;
use tantivy::Index;

use crate::error::{Result, SearchError};
use crate::searcher::types::RankingConfig;

pub struct QueryBuilder<'a> {
    index: &'a Index,
    ranking: &'a RankingConfig,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(index: &'a Index, ranking: &'a RankingConfig) -> Self {
        Self { index, ranking }
    }

    /// Parse a query string into an executable plan.
    pub fn build(&self, query: &str) -> Result<Box<dyn Query>> {
        let schema = self.index.schema();
        let default_fields = self.resolve_default_fields(&schema)?;

        let mut parser = QueryParser::for_index(self.index, default_fields);
        for (name, boost) in &self.ranking.field_boosts {
            if let Ok(field) = schema.get_field(name) {
                parser.set_field_boost(field, *boost);
            }
        }

        parser
            .parse_query(query)
            .map_err(|e| SearchError::InvalidArgument(format!("query parse failed: {e}")))
    }

    /// Parse a query plus an optional filter; the filter narrows the result
    /// set without contributing to ranking intent.
    pub fn build_with_filter(&self, query: &str, filter: Option<&str>) -> Result<Box<dyn Query>> {
        let query = self.build(query)?;
        match filter {
            Some(filter) => {
                let filter = self.build(filter)?;
                Ok(Box::new(BooleanQuery::new(vec![
                    (Occur::Must, query),
                    (Occur::Must, filter),
                ])))
            }
            None => Ok(query),
        }
    }

    fn resolve_default_fields(&self, schema: &Schema) -> Result<Vec<tantivy::schema::Field>> {
        let mut fields = Vec::with_capacity(self.ranking.default_fields.len());
        for name in &self.ranking.default_fields {
            let field = schema.get_field(name).map_err(|_| {
                SearchError::Configuration(format!("default search field not in schema: {name}"))
            })?;
            fields.push(field);
        }
        if fields.is_empty() {
            return Err(SearchError::Configuration(
                "no default search fields configured".to_string(),
            ));
        }
        Ok(fields)
    }
}

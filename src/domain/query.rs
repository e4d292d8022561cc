//! Structured asset query text.

use crate::domain::filter::FilterExpression;

const ATTRIBUTES_FRAGMENT: &str = "
    stringAttributes { type { name } stringValue }
    booleanAttributes { type { name } booleanValue }
    numericAttributes { type { name } numericValue }
    dateAttributes { type { name } dateValue }
    multiValueAttributes { type { name } stringValues }";

const RELATIONS_FRAGMENT: &str = "
    outgoingRelations {
      target { id displayName type { name } }
      type { role corole }
    }
    incomingRelations {
      source { id displayName type { name } }
      type { role corole }
    }";

/// One page of the assets query.
#[derive(Debug, Clone)]
pub struct AssetQuery<'a> {
    pub limit: usize,
    pub offset: usize,
    pub filter: Option<&'a FilterExpression>,
    pub include_attributes: bool,
    pub include_relations: bool,
}

impl AssetQuery<'_> {
    /// Render the query. The first page sends `offset: null`.
    pub fn render(&self) -> String {
        let offset = if self.offset == 0 {
            FilterExpression::null()
        } else {
            FilterExpression::from(self.offset)
        };

        let mut arguments = format!("limit: {}, offset: {}", self.limit, offset.to_structured());
        if let Some(filter) = self.filter.filter(|f| !f.is_empty()) {
            arguments.push_str(", where: ");
            arguments.push_str(&filter.to_structured());
        }

        let attributes = if self.include_attributes {
            ATTRIBUTES_FRAGMENT
        } else {
            ""
        };
        let relations = if self.include_relations {
            RELATIONS_FRAGMENT
        } else {
            ""
        };

        format!(
            "{{
  assets({arguments}) {{
    id
    displayName
    domain {{ id name type {{ name }} parent {{ id name }} }}
    type {{ name }}
    status {{ name }}
    tags {{ name }}{attributes}{relations}
  }}
}}"
        )
    }
}

use std::sync::OnceLock;

use regex::Regex;

use crate::reaction::{ReactantRef, Reaction};

const CHEBI_PREFIX: &str = "CHEBI:";

const QUERY_TEMPLATE: &str = "PREFIX rh:<http://rdf.rhea-db.org/>
PREFIX ch:<http://purl.obolibrary.org/obo/>

SELECT DISTINCT ?reaction ?reactionEquation WHERE {
  ?reaction rdfs:subClassOf rh:Reaction .
  ?reaction rh:status rh:Approved .
  ?reaction rh:equation ?reactionEquation .
  ?reaction rh:side ?reactionSide .

  ?reaction rh:side ?reactionSide1 .
  {left}

  ?reaction rh:side ?reactionSide2 .
  {right}

  ?reactionSide1 rh:transformableTo ?reactionSide2 .
}";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("reactant {name:?} has cross-reference {id:?}, expected CHEBI:<digits>")]
    UnsupportedCrossReference { name: String, id: String },
}

/// Numeric part of a `CHEBI:<digits>` identifier.
pub fn chebi_number(id: &str) -> Option<&str> {
    let digits = id.strip_prefix(CHEBI_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(digits)
}

/// Compact Rhea SPARQL query for the reaction's two sides; catalysts are not part of the match.
pub fn build_query(reaction: &Reaction) -> Result<String, QueryError> {
    Ok(compact(&render_query(&reaction.left, &reaction.right)?))
}

/// Readable form of the query, one triple per line.
pub fn render_query(left: &[ReactantRef], right: &[ReactantRef]) -> Result<String, QueryError> {
    let left = side_block("?reactionSide1", left)?;
    let right = side_block("?reactionSide2", right)?;
    Ok(QUERY_TEMPLATE
        .replace("{left}", &left)
        .replace("{right}", &right))
}

fn side_block(variable: &str, reactants: &[ReactantRef]) -> Result<String, QueryError> {
    let lines = reactants
        .iter()
        .map(|reactant| {
            let number = chebi_number(&reactant.cross_ref_id).ok_or_else(|| {
                QueryError::UnsupportedCrossReference {
                    name: reactant.name.clone(),
                    id: reactant.cross_ref_id.clone(),
                }
            })?;
            Ok(format!(
                "{variable} rh:contains/rh:compound/rh:chebi ch:CHEBI_{number} ."
            ))
        })
        .collect::<Result<Vec<_>, QueryError>>()?;
    Ok(lines.join("\n  "))
}

/// Drop whitespace next to punctuation so the query fits in a URL.
pub fn compact(query: &str) -> String {
    static AFTER_PUNCT: OnceLock<Regex> = OnceLock::new();
    static BEFORE_PUNCT: OnceLock<Regex> = OnceLock::new();
    static ANY_SPACE: OnceLock<Regex> = OnceLock::new();

    let after = AFTER_PUNCT
        .get_or_init(|| Regex::new(r"([^0-9A-Za-z_])\s+(\S)").expect("valid regex"));
    let before = BEFORE_PUNCT
        .get_or_init(|| Regex::new(r"(\S)\s+([^0-9A-Za-z_])").expect("valid regex"));
    let any = ANY_SPACE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"));

    let query = after.replace_all(query, "${1}${2}");
    let query = before.replace_all(&query, "${1}${2}");
    any.replacen(&query, 1, " ").into_owned()
}

//! Serializer re-linearizing a triple set into nested RDF/XML text.
//!
//! Triples are grouped by subject, ordered topologically, rooted at the
//! parentless node of each component and rendered as nested elements; tag
//! names come from shortening each URI through the inverted namespace map.

use std::io;

use indexmap::{IndexMap, IndexSet};
use log::debug;

use crate::error::{RdfError, Result};
use crate::graph::{node_to_triples, root_nodes, topological_sort_triples};
use crate::parser::{Node, NodeKind, Triple, RDF_NS};
use crate::uri::UriRef;

/// The triples matching the given subject, predicate and object ids; a
/// `None` filter matches anything.
pub fn filter_triples<'a>(
    triples: &'a [Triple],
    subject: Option<&str>,
    predicate: Option<&str>,
    object: Option<&str>,
) -> Vec<&'a Triple> {
    triples
        .iter()
        .filter(|triple| {
            subject.map_or(true, |id| id == triple.subject.id)
                && predicate.map_or(true, |id| id == triple.predicate.id)
                && object.map_or(true, |id| id == triple.object.id)
        })
        .collect()
}

// base URI (trimmed of '#') -> prefix
fn invert_schema_definition(
    schema_definition: &IndexMap<String, UriRef>,
) -> IndexMap<String, String> {
    schema_definition
        .iter()
        .map(|(prefix, uri)| (uri.as_str().trim_matches('#').to_string(), prefix.clone()))
        .collect()
}

// the prefix bound to the canonical RDF namespace, "rdf" when unbound
fn rdf_ns_abbreviation(inv_schema_definition: &IndexMap<String, String>) -> String {
    inv_schema_definition
        .get(RDF_NS.trim_end_matches('#'))
        .cloned()
        .unwrap_or_else(|| "rdf".to_string())
}

/// Abbreviates `base#fragment` to `prefix:fragment` through the inverted
/// namespace map.
fn shorten_uri(uri: &str, inv_schema_definition: &IndexMap<String, String>) -> Result<String> {
    let split = uri.rfind('#').ok_or_else(|| {
        RdfError::Serialize(format!(
            "uri {uri:?} doesn't have two parts of type schemaName:tagName"
        ))
    })?;

    let base_uri = uri[..split].trim_matches('#');
    let fragment = uri[split + 1..].trim_end_matches('#').trim();
    if fragment.is_empty() {
        return Err(RdfError::Serialize(format!(
            "uri {uri:?} is missing a fragment"
        )));
    }

    match inv_schema_definition.get(base_uri) {
        Some(prefix) if prefix.is_empty() => Ok(fragment.to_string()),
        Some(prefix) => Ok(format!("{prefix}:{fragment}")),
        None => Err(RdfError::UndefinedNamespace(base_uri.to_string())),
    }
}

// triples left over once the rdf:type / rdf:nodeID attributes are rendered
fn rest_triples<'a>(triples: &'a [Triple]) -> Vec<&'a Triple> {
    let rdf_type_uri = format!("{RDF_NS}type");
    let rdf_node_id_uri = format!("{RDF_NS}nodeID");
    triples
        .iter()
        .filter(|triple| {
            triple.predicate.id != rdf_type_uri && triple.predicate.id != rdf_node_id_uri
        })
        .collect()
}

/// The opening and closing tags for one subject node. The node's single
/// `rdf:type` object names the tag; an optional `rdf:nodeID` triple and,
/// for IRI nodes, an `rdf:about` attribute follow.
fn opening_and_closing_tags(
    triples: &[Triple],
    rdf_ns_abbrev: &str,
    inv_schema_definition: &IndexMap<String, String>,
    tabs: &str,
    node: &Node,
) -> Result<(String, String)> {
    let rdf_type_uri = format!("{RDF_NS}type");
    let rdf_node_id_uri = format!("{RDF_NS}nodeID");

    let type_triples = filter_triples(triples, None, Some(&rdf_type_uri), None);
    if type_triples.len() != 1 {
        return Err(RdfError::Serialize(format!(
            "every subject node must be associated with exactly 1 rdf:type triple, found {}",
            type_triples.len()
        )));
    }
    let node_id_triples = filter_triples(triples, None, Some(&rdf_node_id_uri), None);
    if node_id_triples.len() > 1 {
        return Err(RdfError::Serialize(format!(
            "there must be at most one rdf:nodeID triple, found {}",
            node_id_triples.len()
        )));
    }

    let rdf_node_id = match node_id_triples.first() {
        Some(triple) => format!(" {rdf_ns_abbrev}:nodeID=\"{}\"", triple.object.id),
        None => String::new(),
    };
    let rdf_about = if node.kind == NodeKind::Iri {
        format!(" {rdf_ns_abbrev}:about=\"{}\"", node.id)
    } else {
        String::new()
    };

    let tag_name = shorten_uri(&type_triples[0].object.id, inv_schema_definition)?;
    Ok((
        format!("{tabs}<{tag_name}{rdf_node_id}{rdf_about}>"),
        format!("{tabs}</{tag_name}>"),
    ))
}

/// Renders the subtree rooted at `node` with `tab` repeated `depth` times
/// as the base indent.
fn stringify(
    node: &Node,
    node_to_triples: &IndexMap<Node, Vec<Triple>>,
    inv_schema_definition: &IndexMap<String, String>,
    depth: usize,
    tab: &str,
) -> Result<String> {
    let mut active = IndexSet::new();
    stringify_node(
        node,
        node_to_triples,
        inv_schema_definition,
        depth,
        tab,
        &mut active,
    )
}

fn stringify_node(
    node: &Node,
    node_to_triples: &IndexMap<Node, Vec<Triple>>,
    inv_schema_definition: &IndexMap<String, String>,
    depth: usize,
    tab: &str,
    active: &mut IndexSet<Node>,
) -> Result<String> {
    let empty = Vec::new();
    let triples = node_to_triples.get(node).unwrap_or(&empty);
    let tabs = tab.repeat(depth);
    let rdf_ns_abbrev = rdf_ns_abbreviation(inv_schema_definition);

    let (opening_tag, closing_tag) =
        opening_and_closing_tags(triples, &rdf_ns_abbrev, inv_schema_definition, &tabs, node)?;

    active.insert(node.clone());

    // children render one level deeper
    let depth = depth + 1;
    let tabs = tab.repeat(depth);
    let mut children_string = String::new();
    for triple in rest_triples(triples) {
        let predicate_uri = shorten_uri(&triple.predicate.id, inv_schema_definition)?;

        if triple.object.kind == NodeKind::ResourceLiteral {
            children_string.push_str(&format!(
                "{tabs}<{predicate_uri} {rdf_ns_abbrev}:resource=\"{}\"/>\n",
                triple.object.id
            ));
            continue;
        }

        let mut child_string = format!("{tabs}<{predicate_uri}>\n");
        let owns_triples = node_to_triples
            .get(&triple.object)
            .map_or(false, |list| !list.is_empty());
        if owns_triples && !active.contains(&triple.object) {
            child_string.push_str(&stringify_node(
                &triple.object,
                node_to_triples,
                inv_schema_definition,
                depth + 1,
                tab,
                active,
            )?);
        } else {
            // a leaf object, or a cycle back into a node currently being
            // rendered; either way a flat reference ends the descent
            child_string.push_str(&tab.repeat(depth + 1));
            child_string.push_str(&triple.object.id);
        }
        child_string.push_str(&format!("\n{tabs}</{predicate_uri}>"));

        children_string.push_str(&child_string);
        children_string.push('\n');
    }
    let children_string = children_string.trim_end_matches('\n');

    active.swap_remove(node);

    Ok(format!("{opening_tag}\n{children_string}\n{closing_tag}"))
}

// `<rdf:RDF>` with one xmlns declaration per namespace entry, in map order
fn root_tag_from_schema_definition(
    schema_definition: &IndexMap<String, UriRef>,
    tab: &str,
) -> String {
    let mut root_tag = String::from("<rdf:RDF");
    for (prefix, uri) in schema_definition {
        if prefix.is_empty() {
            root_tag.push_str(&format!("\n{tab}xmlns=\"{uri}\""));
        } else {
            root_tag.push_str(&format!("\n{tab}xmlns:{prefix}=\"{uri}\""));
        }
    }
    root_tag.push('>');
    root_tag
}

/// Renders `triples` as an RDF/XML document under a generated `rdf:RDF`
/// root tag declaring every entry of `schema_definition`. `tab` is the
/// indent unit (spaces or tab characters, the caller's choice).
pub fn triples_to_string(
    triples: &[Triple],
    schema_definition: &IndexMap<String, UriRef>,
    tab: &str,
) -> Result<String> {
    let sorted = topological_sort_triples(triples)?;
    let inv_schema_definition = invert_schema_definition(schema_definition);
    let node_to_triples = node_to_triples(&sorted);
    let roots = root_nodes(&sorted);
    debug!(
        "serializing {} triples under {} root nodes",
        sorted.len(),
        roots.len()
    );

    let mut output = String::new();
    for root in &roots {
        output.push_str(&stringify(
            root,
            &node_to_triples,
            &inv_schema_definition,
            1,
            tab,
        )?);
        output.push('\n');
    }

    Ok(format!(
        "{}\n{}</rdf:RDF>",
        root_tag_from_schema_definition(schema_definition, tab),
        output
    ))
}

/// Renders `triples` and writes the result verbatim. Nothing is written
/// when rendering fails.
pub fn write_to<W: io::Write>(
    w: &mut W,
    triples: &[Triple],
    schema_definition: &IndexMap<String, UriRef>,
    tab: &str,
) -> Result<()> {
    let output = triples_to_string(triples, schema_definition, tab)?;
    w.write_all(output.as_bytes())?;
    Ok(())
}

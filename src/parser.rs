//! Semantic RDF parser: consumes a block tree and produces a deduplicated
//! set of subject-predicate-object triples over value-identified nodes.
//!
//! Each nested subject block discovered during the descent is parsed in its
//! own task inside a scoped fan-out; the scope is joined before
//! [`Parser::parse`] returns, and the first error observed wins.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, OnceLock};

use indexmap::{IndexMap, IndexSet};
use log::{debug, trace};

use crate::error::{RdfError, Result};
use crate::reader::{Attribute, Block, Tag};
use crate::uri::UriRef;

/// The canonical RDF namespace.
pub const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Iri,
    Literal,
    Blank,
    ResourceLiteral,
    NodeIdLiteral,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NodeKind::Iri => "IRI",
            NodeKind::Literal => "LITERAL",
            NodeKind::Blank => "BNODE",
            NodeKind::ResourceLiteral => "RESOURCELITERAL",
            NodeKind::NodeIdLiteral => "NODEIDLITERAL",
        })
    }
}

/// A graph node. Two nodes are the same logical node iff `(kind, id)` are
/// equal; the derived `Eq` and `Hash` carry that identity, and every graph
/// structure downstream keys on it rather than on reference identity.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Node {
    pub kind: NodeKind,
    pub id: String,
}

impl Node {
    pub fn new(kind: NodeKind, id: impl Into<String>) -> Node {
        Node {
            kind,
            id: id.into(),
        }
    }

    pub fn iri(id: impl Into<String>) -> Node {
        Node::new(NodeKind::Iri, id)
    }

    pub fn literal(id: impl Into<String>) -> Node {
        Node::new(NodeKind::Literal, id)
    }

    pub fn blank(id: impl Into<String>) -> Node {
        Node::new(NodeKind::Blank, id)
    }

    pub fn resource_literal(id: impl Into<String>) -> Node {
        Node::new(NodeKind::ResourceLiteral, id)
    }

    pub fn node_id_literal(id: impl Into<String>) -> Node {
        Node::new(NodeKind::NodeIdLiteral, id)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.kind, self.id)
    }
}

/// One RDF statement. The predicate is always an [`NodeKind::Iri`] node.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Triple {
    pub subject: Node,
    pub predicate: Node,
    pub object: Node,
}

impl Triple {
    pub fn new(subject: Node, predicate: Node, object: Node) -> Triple {
        Triple {
            subject,
            predicate,
            object,
        }
    }
}

impl fmt::Display for Triple {
    // the canonical `{subject; predicate; object}` hash form
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}; {}; {}}}", self.subject, self.predicate, self.object)
    }
}

/// Issues document-scoped blank-node ids `"N1"`, `"N2"`, ...
#[derive(Debug, Default)]
pub struct BlankNodeSeq {
    last_id: AtomicI64,
}

impl BlankNodeSeq {
    pub fn new() -> BlankNodeSeq {
        BlankNodeSeq::seeded(0)
    }

    /// A sequence that behaves as if it had already issued ids up to
    /// `N{last_id}`.
    pub fn seeded(last_id: i64) -> BlankNodeSeq {
        BlankNodeSeq {
            last_id: AtomicI64::new(last_id),
        }
    }

    /// The next anonymous blank node.
    pub fn next(&self) -> Node {
        let id = self.last_id.fetch_add(1, Ordering::Relaxed) + 1;
        Node::blank(format!("N{id}"))
    }

    /// A blank node named by an explicit `rdf:nodeID` value.
    pub fn from_id(&self, id: &str) -> Node {
        Node::blank(format!("N{id}"))
    }
}

/// Semantic RDF/XML parser.
///
/// A parser accumulates across `parse` calls: triples keep deduplicating
/// against earlier results and blank-node numbering continues, so several
/// documents can be merged into one graph.
#[derive(Debug)]
pub struct Parser {
    pub triples: Vec<Triple>,
    pub schema_definition: IndexMap<String, UriRef>,
    blank_nodes: BlankNodeSeq,
    rdf_ns: UriRef,
}

impl Default for Parser {
    fn default() -> Parser {
        Parser::new()
    }
}

impl Parser {
    pub fn new() -> Parser {
        Parser::with_namespaces(IndexMap::new())
    }

    /// A parser pre-seeded with namespace hints. Declarations on a parsed
    /// document's root tag override colliding hints.
    pub fn with_namespaces(hints: IndexMap<String, UriRef>) -> Parser {
        let rdf_ns = UriRef::parse(RDF_NS).expect("the canonical RDF namespace parses");
        Parser {
            triples: Vec::new(),
            schema_definition: hints,
            blank_nodes: BlankNodeSeq::new(),
            rdf_ns,
        }
    }

    /// Parses `root` (the `rdf:RDF` block) into the triple set.
    ///
    /// Nested subject blocks are parsed concurrently; the call returns only
    /// once every spawned task has finished, with at most one error.
    pub fn parse(&mut self, root: &Block) -> Result<()> {
        self.schema_definition = parse_header_block(root, &self.schema_definition)?;
        debug!(
            "parsing under {} namespace declarations",
            self.schema_definition.len()
        );

        let ctx = ParseCtx {
            schema: &self.schema_definition,
            rdf_ns: &self.rdf_ns,
            blank_nodes: &self.blank_nodes,
            triples: Mutex::new(self.triples.drain(..).collect()),
            failure: OnceLock::new(),
        };
        let base_uri = ctx.schema.get("").cloned();

        rayon::scope(|scope| {
            for child in &root.children {
                let last_uri = match resolve_base(child, base_uri.clone()) {
                    Ok(base) => base,
                    Err(err) => {
                        ctx.fail(err);
                        break;
                    }
                };
                match ctx.node_from_tag(&child.opening_tag, last_uri.as_ref()) {
                    Ok(subject) => ctx.parse_block(scope, child, subject, last_uri),
                    Err(err) => {
                        ctx.fail(err);
                        break;
                    }
                }
            }
        });

        let ParseCtx {
            triples, failure, ..
        } = ctx;
        if let Some(err) = failure.into_inner() {
            return Err(err);
        }
        self.triples = triples.into_inner().unwrap().into_iter().collect();
        debug!("parsed {} distinct triples", self.triples.len());
        Ok(())
    }
}

/// Collects the `xmlns[:prefix]="uri"` declarations off the root tag. The
/// bare `xmlns` lands under the empty prefix. The `"rdf"` prefix is filled
/// in with the canonical namespace when the document neither declares it
/// nor binds another prefix to that namespace.
fn parse_header_block(
    root: &Block,
    hints: &IndexMap<String, UriRef>,
) -> Result<IndexMap<String, UriRef>> {
    let mut schema = hints.clone();
    for attr in &root.opening_tag.attrs {
        if attr.schema_name == "xmlns" {
            schema.insert(attr.name.clone(), UriRef::parse(&attr.value)?);
        } else if attr.schema_name.is_empty() && attr.name == "xmlns" {
            schema.insert(String::new(), UriRef::parse(&attr.value)?);
        }
    }
    if !schema.contains_key("rdf") && !schema.values().any(|uri| uri.as_str() == RDF_NS) {
        let rdf = UriRef::parse(RDF_NS).expect("the canonical RDF namespace parses");
        schema.insert("rdf".to_string(), rdf);
    }
    Ok(schema)
}

/// A block's own bare `xmlns` redeclaration shadows the inherited base URI.
fn resolve_base(block: &Block, inherited: Option<UriRef>) -> Result<Option<UriRef>> {
    match bare_xmlns(&block.opening_tag) {
        Some(value) => UriRef::parse(value).map(Some),
        None => Ok(inherited),
    }
}

fn bare_xmlns(tag: &Tag) -> Option<&str> {
    tag.attrs
        .iter()
        .find(|attr| attr.schema_name.is_empty() && attr.name == "xmlns")
        .map(|attr| attr.value.as_str())
}

fn is_xmlns(attr: &Attribute) -> bool {
    attr.schema_name == "xmlns" || (attr.schema_name.is_empty() && attr.name == "xmlns")
}

/// Shared state for one `parse` call, threaded through the task fan-out.
/// The triple set sits behind a lock held only per insert; the failure cell
/// is written at most once.
struct ParseCtx<'a> {
    schema: &'a IndexMap<String, UriRef>,
    rdf_ns: &'a UriRef,
    blank_nodes: &'a BlankNodeSeq,
    triples: Mutex<IndexSet<Triple>>,
    failure: OnceLock<RdfError>,
}

impl<'a> ParseCtx<'a> {
    // first error wins; later writers are dropped
    fn fail(&self, err: RdfError) {
        let _ = self.failure.set(err);
    }

    fn failed(&self) -> bool {
        self.failure.get().is_some()
    }

    fn append_triple(&self, triple: Triple) {
        trace!("emit {triple}");
        self.triples.lock().unwrap().insert(triple);
    }

    fn rdf_type(&self) -> Node {
        Node::iri(self.rdf_ns.add_fragment("type").as_str())
    }

    /// `schema_name:name` resolved against the namespace map.
    fn uri_from_pair(&self, schema_name: &str, name: &str) -> Result<UriRef> {
        let base = self
            .schema
            .get(schema_name)
            .ok_or_else(|| RdfError::UndefinedNamespace(schema_name.to_string()))?;
        Ok(base.add_fragment(name))
    }

    /// The first attribute of `tag` whose resolved URI is `rdf:{fragment}`.
    /// `xmlns` declarations are exempt from prefix resolution.
    fn rdf_attribute<'t>(&self, tag: &'t Tag, fragment: &str) -> Result<Option<&'t Attribute>> {
        let wanted = self.rdf_ns.add_fragment(fragment);
        for attr in tag.attrs.iter().filter(|attr| !is_xmlns(attr)) {
            if self.uri_from_pair(&attr.schema_name, &attr.name)? == wanted {
                return Ok(Some(attr));
            }
        }
        Ok(None)
    }

    /// Subject resolution for a block's opening tag: `rdf:about` names an
    /// IRI node (values starting with `#` resolve against the nearest bare
    /// `xmlns` base), `rdf:nodeID` names a blank node, anything else is a
    /// fresh anonymous blank node.
    fn node_from_tag(&self, tag: &Tag, last_uri: Option<&UriRef>) -> Result<Node> {
        // rdf:ID="x" is shorthand for rdf:about="#x"
        let about = match self.rdf_attribute(tag, "ID")? {
            Some(attr) => Some(format!("#{}", attr.value)),
            None => self.rdf_attribute(tag, "about")?.map(|attr| attr.value.clone()),
        };
        if let Some(about) = about {
            if about.starts_with('#') {
                let base = last_uri.ok_or_else(|| {
                    RdfError::InvalidUri(format!(
                        "relative reference {about:?} with no xmlns base in scope"
                    ))
                })?;
                return Ok(Node::iri(base.add_fragment(&about).as_str()));
            }
            return Ok(Node::iri(about));
        }
        match self.rdf_attribute(tag, "nodeID")? {
            Some(attr) => Ok(self.blank_nodes.from_id(&attr.value)),
            None => Ok(self.blank_nodes.next()),
        }
    }

    /// Object of a childless predicate block: `rdf:resource`, then
    /// `rdf:nodeID`, then the block's own text.
    fn object_from_leaf(&self, block: &Block) -> Result<Node> {
        if let Some(attr) = self.rdf_attribute(&block.opening_tag, "resource")? {
            return Ok(Node::resource_literal(attr.value.clone()));
        }
        if let Some(attr) = self.rdf_attribute(&block.opening_tag, "nodeID")? {
            return Ok(Node::node_id_literal(format!("N{}", attr.value)));
        }
        // indentation around the text is layout, not content
        Ok(Node::literal(block.value.trim()))
    }

    /// Parses `block` as a description of `subject`: a type triple for the
    /// block's own tag, then one triple per predicate child. Each nested
    /// object block becomes a new subject parsed in its own task.
    fn parse_block<'s>(
        &'s self,
        scope: &rayon::Scope<'s>,
        block: &'s Block,
        subject: Node,
        last_uri: Option<UriRef>,
    ) where
        'a: 's,
    {
        if self.failed() {
            // an error elsewhere already decided this parse; stop producing
            return;
        }

        let tag = &block.opening_tag;
        let type_uri = match self.uri_from_pair(&tag.schema_name, &tag.name) {
            Ok(uri) => uri,
            Err(err) => return self.fail(err),
        };
        self.append_triple(Triple::new(
            subject.clone(),
            self.rdf_type(),
            Node::iri(type_uri.as_str()),
        ));

        for predicate_block in &block.children {
            let ptag = &predicate_block.opening_tag;
            let predicate = match self.uri_from_pair(&ptag.schema_name, &ptag.name) {
                Ok(uri) => Node::iri(uri.as_str()),
                Err(err) => return self.fail(err),
            };

            if predicate_block.children.is_empty() {
                let object = match self.object_from_leaf(predicate_block) {
                    Ok(node) => node,
                    Err(err) => return self.fail(err),
                };
                self.append_triple(Triple::new(subject.clone(), predicate, object));
                continue;
            }

            for object_block in &predicate_block.children {
                let object_base = match resolve_base(object_block, last_uri.clone()) {
                    Ok(base) => base,
                    Err(err) => return self.fail(err),
                };
                let object = match self.node_from_tag(&object_block.opening_tag, object_base.as_ref())
                {
                    Ok(node) => node,
                    Err(err) => return self.fail(err),
                };
                self.append_triple(Triple::new(
                    subject.clone(),
                    predicate.clone(),
                    object.clone(),
                ));
                scope.spawn(move |scope| self.parse_block(scope, object_block, object, object_base));
            }
        }
    }
}

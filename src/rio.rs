//! Conversions between this crate's triple model and the `rio_api` model
//! types, so triples can be exchanged with rio parsers and formatters.

use rio_api::model::{BlankNode, Literal, NamedNode, Subject, Term, Triple as RioTriple};

use crate::parser::{Node, NodeKind, Triple};

impl From<RioTriple<'_>> for Triple {
    fn from(triple: RioTriple<'_>) -> Triple {
        Triple {
            subject: subject_node(triple.subject),
            predicate: Node::iri(triple.predicate.iri),
            object: term_node(triple.object),
        }
    }
}

fn subject_node(subject: Subject<'_>) -> Node {
    match subject {
        Subject::NamedNode(nn) => Node::iri(nn.iri),
        Subject::BlankNode(bn) => Node::blank(bn.id),
        Subject::Triple(_) => panic!("Subject triples are not supported"),
    }
}

fn term_node(term: Term<'_>) -> Node {
    match term {
        Term::NamedNode(nn) => Node::iri(nn.iri),
        Term::BlankNode(bn) => Node::blank(bn.id),
        // language tags and datatypes are not part of this data model
        Term::Literal(Literal::Simple { value })
        | Term::Literal(Literal::LanguageTaggedString { value, .. })
        | Term::Literal(Literal::Typed { value, .. }) => Node::literal(value),
        Term::Triple(_) => panic!("Subject triples are not supported"),
    }
}

impl<'a> From<&'a Triple> for RioTriple<'a> {
    fn from(triple: &'a Triple) -> RioTriple<'a> {
        RioTriple {
            subject: match triple.subject.kind {
                NodeKind::Iri | NodeKind::ResourceLiteral => Subject::NamedNode(NamedNode {
                    iri: &triple.subject.id,
                }),
                NodeKind::Blank | NodeKind::NodeIdLiteral => Subject::BlankNode(BlankNode {
                    id: &triple.subject.id,
                }),
                NodeKind::Literal => panic!("a literal cannot be a subject"),
            },
            predicate: NamedNode {
                iri: &triple.predicate.id,
            },
            object: match triple.object.kind {
                NodeKind::Iri | NodeKind::ResourceLiteral => Term::NamedNode(NamedNode {
                    iri: &triple.object.id,
                }),
                NodeKind::Blank | NodeKind::NodeIdLiteral => Term::BlankNode(BlankNode {
                    id: &triple.object.id,
                }),
                NodeKind::Literal => Term::Literal(Literal::Simple {
                    value: &triple.object.id,
                }),
            },
        }
    }
}

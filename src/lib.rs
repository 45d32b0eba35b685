//! RDF/XML codec: decodes RDF/XML documents into a deduplicated graph of
//! subject-predicate-object triples, and encodes a triple set back into
//! RDF/XML text.
//!
//! The decode pipeline is `text -> BlockReader -> block tree -> Parser ->
//! triple set`; encoding runs the triple set through the [`graph`]
//! utilities (topological ordering, root discovery) and the [`writer`]
//! back into nested XML.
//!
//! ```
//! use rdfxml::{load_from_str, writer};
//!
//! let parser = load_from_str(
//!     r#"<rdf:RDF
//!         xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
//!         xmlns:ex="https://example.com/ns#">
//!         <ex:Thing><ex:label>hello</ex:label></ex:Thing>
//!     </rdf:RDF>"#,
//! )
//! .unwrap();
//! assert_eq!(parser.triples.len(), 2);
//!
//! let xml = writer::triples_to_string(&parser.triples, &parser.schema_definition, "  ").unwrap();
//! assert!(xml.starts_with("<rdf:RDF"));
//! ```

pub mod error;
pub mod graph;
pub mod parser;
pub mod reader;
mod rio;
pub mod uri;
pub mod writer;

pub use error::{RdfError, Result};
pub use parser::{BlankNodeSeq, Node, NodeKind, Parser, Triple, RDF_NS};
pub use reader::{Attribute, Block, BlockReader, Tag};
pub use uri::{Namespace, UriRef};

use std::fs;
use std::io::Read;
use std::path::Path;

/// Parses an RDF/XML document held in memory and returns the populated
/// [`Parser`].
pub fn load_from_str(content: &str) -> Result<Parser> {
    let root = BlockReader::new(content).read()?;
    let mut parser = Parser::new();
    parser.parse(&root)?;
    Ok(parser)
}

/// Reads `source` to its end and parses it as one RDF/XML document.
pub fn load_from_reader<R: Read>(mut source: R) -> Result<Parser> {
    let mut content = String::new();
    source.read_to_string(&mut content)?;
    load_from_str(&content)
}

/// Opens, reads and parses the RDF/XML file at `path`.
pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Parser> {
    load_from_str(&fs::read_to_string(path)?)
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use pretty_assertions::assert_eq;

    use super::{load_from_file, load_from_reader, load_from_str};

    const SAMPLE: &str = r#"<rdf:RDF
        xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
        xmlns:ex="https://example.com/ns#">
        <ex:Thing ex:ignored="x"></ex:Thing>
    </rdf:RDF>"#;

    #[test]
    fn load_from_str_parses() {
        let parser = load_from_str(SAMPLE).unwrap();
        assert_eq!(parser.triples.len(), 1);
    }

    #[test]
    fn load_from_str_propagates_reader_errors() {
        assert!(load_from_str("<rdf:RDF> </rdf:rdf>").is_err());
    }

    #[test]
    fn load_from_reader_parses() {
        let parser = load_from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(parser.triples.len(), 1);
    }

    #[test]
    fn load_from_file_parses() {
        let path = std::env::temp_dir().join("rdfxml_loader_test.rdf");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        drop(file);

        let parser = load_from_file(&path).unwrap();
        assert_eq!(parser.triples.len(), 1);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn load_from_file_reports_missing_files() {
        assert!(load_from_file("/definitely/not/here.rdf").is_err());
    }
}

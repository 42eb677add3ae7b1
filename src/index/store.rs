//! Tantivy-backed vector index.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tantivy::collector::{Count, DocSetCollector};
use tantivy::directory::MmapDirectory;
use tantivy::query::{AllQuery, Query, TermQuery};
use tantivy::schema::{Field, IndexRecordOption, Value};
use tantivy::{
    Index, IndexReader, IndexSettings, IndexWriter, ReloadPolicy, TantivyDocument as Document, Term,
};

use super::cosine_distance;
use super::schema::ChunkSchema;
use crate::documents::ChunkMetadata;
use crate::error::{IndexError, IndexResult};

/// Writer heap budget in bytes.
const WRITER_HEAP_BYTES: usize = 50_000_000;

const MANIFEST_FILE: &str = "index.json";

/// One query result.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexHit {
    pub id: String,
    pub content: String,
    pub metadata: ChunkMetadata,
    /// Cosine distance to the query vector; lower is more similar.
    pub distance: f32,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Manifest {
    version: u32,
    dimension: Option<usize>,
}

/// Vector index over chunk embeddings with module and document filters.
///
/// All methods take `&self`; writes are serialized through an internal lock
/// and committed before returning, so a successful call is immediately
/// visible to queries and survives a reopen.
pub struct VectorIndex {
    /// Directory holding the index, `None` for in-memory indexes.
    base_path: Option<PathBuf>,

    index: Index,

    reader: IndexReader,

    schema: ChunkSchema,

    /// Index writer (lazily created).
    writer: Mutex<Option<IndexWriter<Document>>>,

    /// Embedding dimension, set by the first committed insert and released
    /// when the index becomes empty.
    dimension: Mutex<Option<usize>>,
}

impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndex")
            .field("base_path", &self.base_path)
            .field("dimension", &self.dimension().ok().flatten())
            .finish()
    }
}

impl VectorIndex {
    /// Create or open an index stored under `base_path`.
    pub fn open(base_path: impl AsRef<Path>) -> IndexResult<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        let index_path = base_path.join("tantivy");
        std::fs::create_dir_all(&index_path)?;

        let (tantivy_schema, chunk_schema) = ChunkSchema::build();

        let existing = index_path.join("meta.json").exists();
        let index = if existing {
            Index::open_in_dir(&index_path)?
        } else {
            let dir = MmapDirectory::open(&index_path)?;
            Index::create(dir, tantivy_schema, IndexSettings::default())?
        };

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;

        if existing {
            reader.reload()?;
        }

        let manifest = load_manifest(&base_path.join(MANIFEST_FILE))?;

        tracing::debug!(
            target: "index",
            "opened index at {} (dimension {:?})",
            base_path.display(),
            manifest.dimension
        );

        Ok(Self {
            base_path: Some(base_path),
            index,
            reader,
            schema: chunk_schema,
            writer: Mutex::new(None),
            dimension: Mutex::new(manifest.dimension),
        })
    }

    /// Create a throwaway index held in RAM.
    pub fn in_memory() -> IndexResult<Self> {
        let (tantivy_schema, chunk_schema) = ChunkSchema::build();
        let index = Index::create_in_ram(tantivy_schema);
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;

        Ok(Self {
            base_path: None,
            index,
            reader,
            schema: chunk_schema,
            writer: Mutex::new(None),
            dimension: Mutex::new(None),
        })
    }

    pub fn base_path(&self) -> Option<&Path> {
        self.base_path.as_deref()
    }

    /// Embedding dimension, once anything has been added.
    pub fn dimension(&self) -> IndexResult<Option<usize>> {
        let guard = self.dimension.lock().map_err(|_| IndexError::LockPoisoned)?;
        Ok(*guard)
    }

    /// Insert or overwrite entries.
    ///
    /// The four slices are parallel. An existing entry with the same id is
    /// replaced.
    pub fn add(
        &self,
        ids: &[String],
        texts: &[String],
        vectors: &[Vec<f32>],
        metadatas: &[ChunkMetadata],
    ) -> IndexResult<()> {
        let n = ids.len();
        if texts.len() != n || vectors.len() != n || metadatas.len() != n {
            return Err(IndexError::LengthMismatch {
                ids: n,
                texts: texts.len(),
                vectors: vectors.len(),
                metadatas: metadatas.len(),
            });
        }
        if n == 0 {
            return Ok(());
        }

        // Held until the commit lands; deletes may release the dimension.
        let mut dimension = self.dimension.lock().map_err(|_| IndexError::LockPoisoned)?;
        let width = check_width(*dimension, vectors)?;

        let indexed_at = Utc::now().timestamp() as u64;
        let mut documents = Vec::with_capacity(n);
        for i in 0..n {
            documents.push(self.build_document(
                &ids[i],
                &texts[i],
                &vectors[i],
                &metadatas[i],
                indexed_at,
            )?);
        }

        let entry_field = self.schema.entry_id;
        self.write(|writer| {
            for (id, doc) in ids.iter().zip(documents) {
                writer.delete_term(Term::from_field_text(entry_field, id));
                writer.add_document(doc)?;
            }
            Ok(())
        })?;

        if dimension.is_none() {
            *dimension = Some(width);
            self.save_dimension(Some(width))?;
        }

        tracing::debug!(target: "index", "added {n} entries");
        Ok(())
    }

    /// Nearest entries to `vector`, ascending by distance, at most `k`.
    pub fn query(
        &self,
        vector: &[f32],
        module_filter: Option<&str>,
        k: usize,
    ) -> IndexResult<Vec<IndexHit>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        match self.dimension()? {
            None => return Ok(Vec::new()),
            Some(expected) if expected != vector.len() => {
                return Err(IndexError::DimensionMismatch {
                    expected,
                    actual: vector.len(),
                });
            }
            Some(_) => {}
        }

        let searcher = self.reader.searcher();
        let filter = self.filter_query(self.schema.module_id, module_filter);
        let addresses = searcher.search(filter.as_ref(), &DocSetCollector)?;

        let mut hits = Vec::with_capacity(addresses.len());
        for address in addresses {
            let doc: Document = searcher.doc(address)?;
            hits.push(self.read_hit(&doc, vector)?);
        }

        hits.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(k);

        tracing::debug!(
            target: "index",
            "query scope={} returned {} hits",
            module_filter.unwrap_or("*"),
            hits.len()
        );
        Ok(hits)
    }

    /// Remove every entry of a document. Returns how many were removed.
    pub fn delete_by_document(&self, document_id: &str) -> IndexResult<usize> {
        self.delete_where(self.schema.document_id, document_id)
    }

    /// Remove every entry of a module. Returns how many were removed.
    pub fn delete_by_module(&self, module_id: &str) -> IndexResult<usize> {
        self.delete_where(self.schema.module_id, module_id)
    }

    /// Number of entries, optionally restricted to one module.
    pub fn count(&self, module_filter: Option<&str>) -> IndexResult<usize> {
        self.count_where(self.schema.module_id, module_filter)
    }

    pub fn count_by_document(&self, document_id: &str) -> IndexResult<usize> {
        self.count_where(self.schema.document_id, Some(document_id))
    }

    fn delete_where(&self, field: Field, value: &str) -> IndexResult<usize> {
        let mut dimension = self.dimension.lock().map_err(|_| IndexError::LockPoisoned)?;

        let existing = self.count_where(field, Some(value))?;
        if existing == 0 {
            return Ok(0);
        }

        self.write(|writer| {
            writer.delete_term(Term::from_field_text(field, value));
            Ok(())
        })?;

        tracing::debug!(target: "index", "deleted {existing} entries for {value}");

        // An empty index holds no vectors, so any width may come next.
        if dimension.is_some() && self.count(None)? == 0 {
            *dimension = None;
            self.save_dimension(None)?;
            tracing::debug!(target: "index", "index is empty, vector dimension released");
        }
        Ok(existing)
    }

    fn count_where(&self, field: Field, value: Option<&str>) -> IndexResult<usize> {
        let searcher = self.reader.searcher();
        let query = self.filter_query(field, value);
        Ok(searcher.search(query.as_ref(), &Count)?)
    }

    fn filter_query(&self, field: Field, value: Option<&str>) -> Box<dyn Query> {
        match value {
            Some(value) => Box::new(TermQuery::new(
                Term::from_field_text(field, value),
                IndexRecordOption::Basic,
            )),
            None => Box::new(AllQuery),
        }
    }

    /// Run writer operations and commit them. On error the pending
    /// operations are dropped with the writer.
    fn write<F>(&self, ops: F) -> IndexResult<()>
    where
        F: FnOnce(&mut IndexWriter<Document>) -> IndexResult<()>,
    {
        let mut guard = self.writer.lock().map_err(|_| IndexError::LockPoisoned)?;
        let mut writer = match guard.take() {
            Some(writer) => writer,
            None => self.index.writer_with_num_threads(1, WRITER_HEAP_BYTES)?,
        };

        ops(&mut writer)?;
        writer.commit()?;
        *guard = Some(writer);
        drop(guard);

        self.reader.reload()?;
        Ok(())
    }

    fn save_dimension(&self, dimension: Option<usize>) -> IndexResult<()> {
        match &self.base_path {
            Some(base_path) => save_manifest(
                &base_path.join(MANIFEST_FILE),
                &Manifest {
                    version: 1,
                    dimension,
                },
            ),
            None => Ok(()),
        }
    }

    fn build_document(
        &self,
        id: &str,
        text: &str,
        vector: &[f32],
        metadata: &ChunkMetadata,
        indexed_at: u64,
    ) -> IndexResult<Document> {
        let vector_json =
            serde_json::to_string(vector).map_err(|e| IndexError::Serialization(e.to_string()))?;
        let extra_json = serde_json::to_string(&metadata.extra)
            .map_err(|e| IndexError::Serialization(e.to_string()))?;

        let mut doc = Document::new();
        doc.add_text(self.schema.entry_id, id);
        doc.add_text(self.schema.module_id, &metadata.module_id);
        doc.add_text(self.schema.document_id, &metadata.document_id);
        doc.add_u64(self.schema.chunk_index, metadata.chunk_index as u64);
        doc.add_text(
            self.schema.chapter,
            metadata.chapter.as_deref().unwrap_or_default(),
        );
        doc.add_text(
            self.schema.section,
            metadata.section.as_deref().unwrap_or_default(),
        );
        doc.add_text(self.schema.content, text);
        doc.add_text(self.schema.vector, &vector_json);
        doc.add_text(self.schema.extra, &extra_json);
        doc.add_u64(self.schema.indexed_at, indexed_at);
        Ok(doc)
    }

    fn read_hit(&self, doc: &Document, query: &[f32]) -> IndexResult<IndexHit> {
        let text = |field: Field| -> String {
            doc.get_first(field)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()
        };
        let label = |field: Field| -> Option<String> {
            doc.get_first(field)
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let vector: Vec<f32> = serde_json::from_str(&text(self.schema.vector))
            .map_err(|e| IndexError::Serialization(format!("bad stored vector: {e}")))?;
        let extra: BTreeMap<String, String> =
            serde_json::from_str(&text(self.schema.extra)).unwrap_or_default();

        let metadata = ChunkMetadata {
            module_id: text(self.schema.module_id),
            document_id: text(self.schema.document_id),
            chunk_index: doc
                .get_first(self.schema.chunk_index)
                .and_then(|v| v.as_u64())
                .unwrap_or_default() as usize,
            chapter: label(self.schema.chapter),
            section: label(self.schema.section),
            extra,
        };

        Ok(IndexHit {
            id: text(self.schema.entry_id),
            content: text(self.schema.content),
            distance: cosine_distance(query, &vector),
            metadata,
        })
    }
}

/// Width every vector must have: the stored dimension, or the first vector's
/// length when nothing is stored yet.
fn check_width(claimed: Option<usize>, vectors: &[Vec<f32>]) -> IndexResult<usize> {
    let expected = claimed.unwrap_or_else(|| vectors.first().map_or(0, Vec::len));
    if let Some(bad) = vectors.iter().find(|v| v.len() != expected) {
        return Err(IndexError::DimensionMismatch {
            expected,
            actual: bad.len(),
        });
    }
    Ok(expected)
}

fn load_manifest(path: &Path) -> IndexResult<Manifest> {
    if !path.exists() {
        return Ok(Manifest::default());
    }
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| IndexError::Serialization(format!("Failed to parse {MANIFEST_FILE}: {e}")))
}

fn save_manifest(path: &Path, manifest: &Manifest) -> IndexResult<()> {
    let content = serde_json::to_string_pretty(manifest)
        .map_err(|e| IndexError::Serialization(e.to_string()))?;
    std::fs::write(path, content)?;
    Ok(())
}

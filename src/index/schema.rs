//! Tantivy schema for chunk vector storage.

use tantivy::schema::{Field, NumericOptions, STORED, STRING, Schema, SchemaBuilder};

/// Schema fields for one indexed chunk.
#[derive(Debug)]
pub struct ChunkSchema {
    /// Entry id (`{document_id}_chunk_{index}`), unique across the index.
    pub entry_id: Field,

    /// Owning module, for scoped queries.
    pub module_id: Field,

    /// Owning document, for bulk deletes.
    pub document_id: Field,

    pub chunk_index: Field,

    /// Chapter label, empty when absent.
    pub chapter: Field,

    /// Section label, empty when absent.
    pub section: Field,

    /// Chunk text returned to the retriever.
    pub content: Field,

    /// Embedding as a JSON array of floats.
    pub vector: Field,

    /// Extension metadata as a JSON object.
    pub extra: Field,

    /// Timestamp when indexed (UTC seconds).
    pub indexed_at: Field,
}

impl ChunkSchema {
    pub fn build() -> (Schema, Self) {
        let mut builder = SchemaBuilder::default();

        // Exact-match keys
        let entry_id = builder.add_text_field("entry_id", STRING | STORED);
        let module_id = builder.add_text_field("module_id", STRING | STORED);
        let document_id = builder.add_text_field("document_id", STRING | STORED);

        let stored_u64 = NumericOptions::default().set_stored();
        let chunk_index = builder.add_u64_field("chunk_index", stored_u64.clone());

        // Payload, stored only
        let chapter = builder.add_text_field("chapter", STORED);
        let section = builder.add_text_field("section", STORED);
        let content = builder.add_text_field("content", STORED);
        let vector = builder.add_text_field("vector", STORED);
        let extra = builder.add_text_field("extra", STORED);

        let indexed_at = builder.add_u64_field("indexed_at", stored_u64);

        let schema = builder.build();

        let chunk_schema = Self {
            entry_id,
            module_id,
            document_id,
            chunk_index,
            chapter,
            section,
            content,
            vector,
            extra,
            indexed_at,
        };

        (schema, chunk_schema)
    }
}

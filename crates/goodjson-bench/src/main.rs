//! Benchmark for goodjson encoding and decoding over a library catalogue.
//!
//! Builds a graph of authors, series and books (each series points at the
//! previous one, so follow mode has real chains to walk), then measures
//! encode with and without follow mode, decode and pagination.
//!
//! Usage: `bench-library [books.json]`. Without a file, a synthetic
//! catalogue of 20k books is generated.

use std::env;
use std::fs;
use std::time::Instant;

use goodjson::model::{FieldPolicy, FieldType, ReferenceField, SchemaBuilder, SchemaRegistry};
use goodjson::{
    paginate, validate_registry, Decoder, Document, DocumentBuilder, DocumentStore, EncodeOptions,
    Encoder, MemoryStore, ObjectId, PageRequest, Value,
};
use serde::Deserialize;

const SYNTHETIC_BOOKS: usize = 20_000;
const AUTHORS: usize = 500;
const SERIES: usize = 200;
const ENCODE_ITERS: u32 = 5;

// =============================================================================
// INPUT DATA
// =============================================================================

#[derive(Debug, Deserialize)]
struct BookRecord {
    title: String,
    author: String,
    year: i32,
    #[serde(default)]
    series: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

fn synthetic_records() -> Vec<BookRecord> {
    (0..SYNTHETIC_BOOKS)
        .map(|i| BookRecord {
            title: format!("Book {}", i),
            author: format!("Author {}", i % AUTHORS),
            year: 1950 + (i % 75) as i32,
            series: (i % 3 != 0).then(|| format!("Series {}", i % SERIES)),
            tags: (0..i % 4).map(|t| format!("tag-{}", t)).collect(),
        })
        .collect()
}

// =============================================================================
// SCHEMA
// =============================================================================

fn library_registry() -> SchemaRegistry {
    [
        SchemaBuilder::embedded("publication")
            .int("year")
            .typed("catalog_id", FieldType::Uuid)
            .build(),
        SchemaBuilder::document("authors").string_required("name").build(),
        SchemaBuilder::document("series")
            .string_required("name")
            .reference("previous", ReferenceField::plain("series"))
            .build(),
        SchemaBuilder::document("books")
            .string_required("title")
            .reference("author", ReferenceField::plain("authors"))
            .reference("series", ReferenceField::plain("series"))
            .embedded_field("publication", "publication")
            .list("tags", FieldType::String)
            .string_with("shelf_code", FieldPolicy::exclude_encode())
            .datetime("added")
            .build(),
    ]
    .into_iter()
    .collect()
}

/// Loads records into the store and returns the book documents.
fn build_catalogue(records: &[BookRecord], store: &MemoryStore) -> Vec<Document> {
    let mut author_ids = std::collections::HashMap::new();
    let mut series_ids: std::collections::HashMap<String, ObjectId> = std::collections::HashMap::new();
    let mut last_series: Option<ObjectId> = None;
    let mut books = Vec::with_capacity(records.len());

    for (i, record) in records.iter().enumerate() {
        let author = *author_ids.entry(record.author.clone()).or_insert_with(|| {
            let id = ObjectId::derived(format!("author:{}", record.author).as_bytes());
            store
                .persist(DocumentBuilder::new("authors").id(id).set("name", record.author.as_str()).build())
                .expect("Failed to persist author");
            id
        });

        let series = record.series.as_ref().map(|name| {
            *series_ids.entry(name.clone()).or_insert_with(|| {
                let id = ObjectId::derived(format!("series:{}", name).as_bytes());
                let mut builder = DocumentBuilder::new("series").id(id).set("name", name.as_str());
                if let Some(previous) = last_series {
                    builder = builder.reference("previous", previous);
                }
                store.persist(builder.build()).expect("Failed to persist series");
                last_series = Some(id);
                id
            })
        });

        let mut builder = DocumentBuilder::new("books")
            .id(ObjectId::derived(format!("book:{}", i).as_bytes()))
            .set("title", record.title.as_str())
            .reference("author", author)
            .embed("publication", "publication", |p| {
                p.set("year", record.year).set("catalog_id", uuid::Uuid::now_v7())
            })
            .set(
                "tags",
                record.tags.iter().map(|t| Value::from(t.as_str())).collect::<Vec<_>>(),
            )
            .set("shelf_code", format!("S{:05}", i))
            .datetime("added", 1_700_000_000_000 + i as i64 * 60_000);
        if let Some(series) = series {
            builder = builder.reference("series", series);
        }
        books.push(builder.build());
    }

    books
}

fn bench_encode(label: &str, encoder: &Encoder<'_>, books: &[Document]) -> String {
    // Warmup
    let _ = encoder.encode_array(books).expect("Failed to encode");

    let start = Instant::now();
    let mut json = None;
    for _ in 0..ENCODE_ITERS {
        json = Some(encoder.encode_array(books).expect("Failed to encode"));
    }
    let elapsed = start.elapsed() / ENCODE_ITERS;
    let text = json.unwrap().to_string();

    println!("\nEncode ({}): {:?} (avg of {} iterations)", label, elapsed, ENCODE_ITERS);
    println!(
        "  {} documents, {:.1} MB of JSON, {:.0} docs/s",
        books.len(),
        text.len() as f64 / 1_000_000.0,
        books.len() as f64 / elapsed.as_secs_f64()
    );
    text
}

fn main() {
    let records = match env::args().nth(1) {
        Some(path) => {
            println!("Loading books from {}...", path);
            let data = fs::read_to_string(&path).expect("Failed to read input file");
            serde_json::from_str::<Vec<BookRecord>>(&data).expect("Failed to parse input file")
        }
        None => {
            println!("Generating {} synthetic books...", SYNTHETIC_BOOKS);
            synthetic_records()
        }
    };

    let registry = library_registry();
    validate_registry(&registry).expect("Library schema is inconsistent");

    let store = MemoryStore::new();
    let build_start = Instant::now();
    let books = build_catalogue(&records, &store);
    println!(
        "Built {} books, {} authors, {} series in {:?}",
        books.len(),
        store.count("authors").expect("Failed to count authors"),
        store.count("series").expect("Failed to count series"),
        build_start.elapsed()
    );

    // Encode without follow mode (ids only)
    let ids_only = Encoder::new(&registry, &store);
    let flat_json = bench_encode("ids only", &ids_only, &books);

    // Encode with follow mode at several depths
    for depth in [1, 3, 8] {
        let following = Encoder::new(&registry, &store).with_options(EncodeOptions::follow_to(depth));
        bench_encode(&format!("follow, depth {}", depth), &following, &books);
    }

    // Decode the flat rendering back
    let decoder = Decoder::new(&registry, &store);
    let parsed: serde_json::Value = serde_json::from_str(&flat_json).expect("Failed to parse output");
    let decode_start = Instant::now();
    let decoded = decoder.decode_many(&parsed, "books").expect("Failed to decode");
    let decode_time = decode_start.elapsed();
    println!(
        "\nDecode: {:?} ({:.0} docs/s)",
        decode_time,
        decoded.len() as f64 / decode_time.as_secs_f64()
    );
    assert_eq!(decoded.len(), books.len());
    // shelf_code is never encoded, so it cannot come back
    assert!(decoded.iter().all(|doc| !doc.contains("shelf_code")));

    // Paginate
    let following = Encoder::new(&registry, &store).with_options(EncodeOptions::follow());
    let page_start = Instant::now();
    let mut pages = 0;
    let mut request = PageRequest::new(1, 50);
    loop {
        let envelope = paginate(&following, &books, request).expect("Failed to paginate");
        pages += 1;
        match envelope.meta.next_num() {
            Some(next) => request.page = next,
            None => break,
        }
    }
    let page_time = page_start.elapsed();
    println!("\nPaginate (follow, 50 per page): {} pages in {:?}", pages, page_time);

    // Summary
    println!("\n=== Summary ===");
    println!("Books: {}", books.len());
    println!("Stored documents: {}", store.len().expect("Failed to count documents"));
    println!(
        "Flat JSON: {} bytes ({:.1} MB)",
        flat_json.len(),
        flat_json.len() as f64 / 1_000_000.0
    );
}

pub mod core;
pub mod storage;
pub mod codec;
pub mod compression;
pub mod index;
pub mod query;
pub mod update;
pub mod collection;
pub mod vector;

pub use crate::core::config::{Config, OpenMode, SyncMode};
pub use crate::core::database::{Database, MEMORY_PATH};
pub use crate::core::error::{Error, ErrorKind, Result};
pub use crate::core::stats::{CollectionStats, CompactionStats, DatabaseStats};
pub use crate::core::types::{Document, DocumentId, VectorId};
pub use crate::core::value::Value;
pub use crate::index::{IndexField, IndexInfo, IndexOptions};
pub use crate::query::{ExecutionPlan, FindOptions, SortOrder};
pub use crate::collection::Cursor;
pub use crate::vector::{
    CompressionMode, DistanceMetric, EmbeddingProvider, SearchHit, StoredVector, VectorConfig, VectorStats,
};

/*
┌────────────────────────────────────────────────────────────────────────────────────────────┐
│                             EMBERDB STRUCT ARCHITECTURE                                     │
└────────────────────────────────────────────────────────────────────────────────────────────┘

┌─────────────────────────────────────── CORE LAYER ──────────────────────────────────────────┐
│                                                                                              │
│  ┌────────────────────────────────────────────────────────────────────────────────────┐    │
│  │                               struct Database                                       │    │
│  │  ┌──────────────────────────────────────────────────────────────────────────────┐ │    │
│  │  │ path: Option<PathBuf>              // None for ":memory:"                    │ │    │
│  │  │ config: Config                     // page size, cache, sync, compaction    │ │    │
│  │  │ pager: Arc<Pager>                  // page cache over the backing medium    │ │    │
│  │  │ heap: Arc<RecordHeap>              // append-only records on pages          │ │    │
│  │  │ collections: RwLock<HashMap<String, Arc<RwLock<Collection>>>>               │ │    │
│  │  │ vectors: RwLock<HashMap<String, Arc<RwLock<VectorCollection>>>>             │ │    │
│  │  │ gate: RwLock<()>                   // shared by writers, exclusive for sync │ │    │
│  │  │ meta: Mutex<Meta>                  // generation, durable catalog pointer   │ │    │
│  │  │ _lock: Option<FileLock>            // flock on <db>.lock                    │ │    │
│  │  └──────────────────────────────────────────────────────────────────────────────┘ │    │
│  └────────────────────────────────────────────────────────────────────────────────────┘    │
│                                                                                              │
│  ┌──────────────────┐  ┌──────────────────┐  ┌───────────────────────────────────────┐    │
│  │ struct Config    │  │ struct Document  │  │ struct DatabaseStats                  │    │
│  │ • page_size      │  │ • fields:        │  │ • collections: Vec<CollectionStats>   │    │
│  │ • cache_pages    │  │   BTreeMap<      │  │ • vector_collections: Vec<VectorStats>│    │
│  │ • sync_mode      │  │   String, Value> │  │ • pager: PagerStats                   │    │
│  │ • auto_compaction│  └──────────────────┘  │ • heap: HeapStats                     │    │
│  └──────────────────┘                        └───────────────────────────────────────┘    │
│  ┌──────────────────┐  ┌──────────────────┐                                                │
│  │ enum DocumentId  │  │ enum Value       │                                                │
│  │ • Int(i64)       │  │ • Null, Bool     │                                                │
│  │ • Text(String)   │  │ • Int, Float     │                                                │
│  └──────────────────┘  │ • String, Time   │                                                │
│                        │ • Array, Object  │                                                │
│                        └──────────────────┘                                                │
└──────────────────────────────────────────────────────────────────────────────────────────────┘

┌────────────────────────────────────── STORAGE LAYER ────────────────────────────────────────┐
│                                                                                              │
│  ┌────────────────────────┐  ┌─────────────────────────┐  ┌────────────────────────┐      │
│  │ struct Pager           │  │ struct RecordHeap       │  │ struct Catalog         │      │
│  │ • backend: PageBackend │  │ • tail: TailPage        │  │ • generation           │      │
│  │ • cache: LruCache      │  │ • owned: BTreeSet       │  │ • heap_pages           │      │
│  │ • free_list            │  │ • live_bytes            │  │ • collections          │      │
│  │ • pending_free         │  │ • append/read/release   │  │ • vector_collections   │      │
│  └────────────────────────┘  └─────────────────────────┘  └────────────────────────┘      │
│                                                                                              │
│  page 0: DatabaseHeader { magic, version, page_size, page_count, catalog, generation }      │
│  page n: [ crc32 | kind | next | used ] [ record bytes ... ]                                │
└──────────────────────────────────────────────────────────────────────────────────────────────┘

┌─────────────────────────────────── COLLECTION LAYER ────────────────────────────────────────┐
│                                                                                              │
│  ┌────────────────────────┐  ┌─────────────────────────┐  ┌────────────────────────┐      │
│  │ struct Collection      │  │ struct IndexManager     │  │ struct Cursor          │      │
│  │ • by_id: HashMap       │  │ • indexes: Vec<         │  │ • ids snapshot         │      │
│  │ • order: BTreeMap      │  │   SecondaryIndex>       │  │ • skip / limit         │      │
│  │ • indexes              │  │ • prepare_* / apply_*   │  │ • rewind()             │      │
│  └────────────────────────┘  └─────────────────────────┘  └────────────────────────┘      │
│                                                                                              │
│  ┌────────────────────────┐  ┌─────────────────────────┐  ┌────────────────────────┐      │
│  │ enum Query             │  │ struct QueryPlanner     │  │ enum UpdateExpression  │      │
│  │ • And / Or / Nor       │  │ • CollectionScan        │  │ • Operators(Vec<..>)   │      │
│  │ • Field(conditions)    │  │ • IdLookup              │  │ • Replace(Document)    │      │
│  └────────────────────────┘  │ • IndexScan             │  └────────────────────────┘      │
│                               └─────────────────────────┘                                   │
└──────────────────────────────────────────────────────────────────────────────────────────────┘

┌───────────────────────────────────── VECTOR LAYER ──────────────────────────────────────────┐
│                                                                                              │
│  ┌────────────────────────┐  ┌─────────────────────────┐  ┌────────────────────────┐      │
│  │ struct VectorCollection│  │ struct HnswGraph        │  │ enum VectorPayload     │      │
│  │ • config: VectorConfig │  │ • nodes: Vec<Node>      │  │ • Raw(Vec<f32>)        │      │
│  │ • graph: HnswGraph     │  │ • deleted: RoaringBitmap│  │ • Delta(DeltaVector)   │      │
│  │ • codebook             │  │ • entry_point           │  │ • Quantized(..)        │      │
│  │ • provider             │  │ • search / insert       │  │ • Text(String)         │      │
│  └────────────────────────┘  └─────────────────────────┘  └────────────────────────┘      │
└──────────────────────────────────────────────────────────────────────────────────────────────┘

┌────────────────────────────────── RELATIONSHIPS ────────────────────────────────────────────┐
│                                                                                              │
│  Database ──owns──> Collection ──stores_in──> RecordHeap ──pages_from──> Pager              │
│     │                   │                                                                   │
│     │                   ├──owns──> IndexManager ──contains──> SecondaryIndex               │
│     │                   │                                                                   │
│     │                   └──plans_with──> QueryPlanner ──filters_with──> DocumentMatcher    │
│     │                                                                                       │
│     ├──owns──> VectorCollection ──owns──> HnswGraph                                        │
│     │                   │                                                                   │
│     │                   └──embeds_with──> EmbeddingProvider                                │
│     │                                                                                       │
│     └──sync──> Catalog ──referenced_by──> DatabaseHeader (page 0)                          │
│                                                                                              │
└──────────────────────────────────────────────────────────────────────────────────────────────┘
*/

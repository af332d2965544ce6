use anyhow::bail;
use clap::Parser;
use core::fmt;

/// Runtime configuration for the `blog-tonic-server` binary.
///
/// All values are parsed from CLI arguments or environment variables (a
/// `.env` file is loaded first), with defaults that match a local MongoDB.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "blog-tonic-server",
    version,
    about = "A gRPC service for blog records stored in MongoDB"
)]
pub struct CliArgs {
    /// Address to listen on (TCP or Unix socket path; use --uds for Unix socket).
    ///
    /// Example: "0.0.0.0:50051" or "/tmp/blog-uds.sock"
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("0.0.0.0:50051"))]
    pub server_addr: String,

    /// Listen on a Unix socket instead of TCP. If set, `SERVER_ADDR` must be a file path.
    #[arg(short, long, default_value_t = false)]
    pub uds: bool,

    /// MongoDB connection string.
    ///
    /// Environment variable: `MONGODB_URI`
    #[arg(long, env = "MONGODB_URI", default_value_t = String::from("mongodb://localhost:27017"))]
    pub mongodb_uri: String,

    /// Database holding the blog collection.
    ///
    /// Environment variable: `MONGODB_DATABASE`
    #[arg(long, env = "MONGODB_DATABASE", default_value_t = String::from("mydb"))]
    pub database: String,

    /// Collection holding blog records.
    ///
    /// Environment variable: `MONGODB_COLLECTION`
    #[arg(long, env = "MONGODB_COLLECTION", default_value_t = String::from("blog"))]
    pub collection: String,

    /// Capacity of the channel between a `ListBlogs` cursor and the gRPC
    /// stream.
    ///
    /// The cursor is read ahead by at most this many records before it waits
    /// for the client to consume more.
    ///
    /// Environment variable: `STREAM_BUFFER_SIZE`
    #[arg(long, env = "STREAM_BUFFER_SIZE", default_value_t = 16)]
    pub stream_buffer_size: usize,

    /// Report `NOT_FOUND` from `DeleteBlog` when no record matched.
    ///
    /// Off by default: deleting a missing id reports success, the same as
    /// deleting an existing one.
    ///
    /// Environment variable: `STRICT_DELETE`
    #[arg(long, env = "STRICT_DELETE", default_value_t = false)]
    pub strict_delete: bool,
}

#[derive(Clone)]
pub struct ServerConfig {
    pub server_addr: String,
    pub uds: bool,
    pub mongodb_uri: String,
    pub database: String,
    pub collection: String,
    pub stream_buffer_size: usize,
    pub strict_delete: bool,
}

// The connection string may embed credentials.
impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("server_addr", &self.server_addr)
            .field("uds", &self.uds)
            .field("mongodb_uri", &"***REDACTED***")
            .field("database", &self.database)
            .field("collection", &self.collection)
            .field("stream_buffer_size", &self.stream_buffer_size)
            .field("strict_delete", &self.strict_delete)
            .finish()
    }
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.stream_buffer_size == 0 {
            bail!("STREAM_BUFFER_SIZE must be greater than 0");
        }

        if args.database.trim().is_empty() {
            bail!("MONGODB_DATABASE must not be empty");
        }

        if args.collection.trim().is_empty() {
            bail!("MONGODB_COLLECTION must not be empty");
        }

        Ok(Self {
            server_addr: args.server_addr,
            uds: args.uds,
            mongodb_uri: args.mongodb_uri,
            database: args.database,
            collection: args.collection,
            stream_buffer_size: args.stream_buffer_size,
            strict_delete: args.strict_delete,
        })
    }
}

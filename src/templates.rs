//! Command-template catalog: a table of `{ name, title, build }` records,
//! iterated uniformly by the Runner, plus the literal-command-template path
//! that replaces the catalog when the CLI tail supplies one.
//!
//! The fixed-width randomization window every template reserves after a
//! key-prefix occurrence is always [`KEY_WINDOW_LEN`] bytes regardless of the
//! `-r` keyspace bound; see `DESIGN.md` for why that bound and the window
//! width are kept as two separate quantities.

use crate::cli::RunConfig;
use crate::resp::format_argv;

/// Width, in bytes, of the placeholder window reserved immediately after
/// every key-prefix occurrence in a built command.
pub const KEY_WINDOW_LEN: usize = 12;

fn keyed_token(cfg: &RunConfig) -> Vec<u8> {
    let mut tok = cfg.key_prefix.clone().into_bytes();
    tok.extend(std::iter::repeat(b'0').take(KEY_WINDOW_LEN));
    tok
}

fn payload(cfg: &RunConfig) -> Vec<u8> {
    vec![b'A'; cfg.data_size]
}

/// One entry in the built-in test catalog.
pub struct CatalogEntry {
    pub name: &'static str,
    pub title: &'static str,
    pub build: fn(&RunConfig) -> Vec<u8>,
}

macro_rules! entry {
    ($name:literal, $title:literal, $build:expr) => {
        CatalogEntry {
            name: $name,
            title: $title,
            build: $build,
        }
    };
}

pub const CATALOG: &[CatalogEntry] = &[
    entry!("ping_inline", "PING_INLINE", |_cfg| b"PING\r\n".to_vec()),
    entry!("ping_bulk", "PING_BULK", |_cfg| format_argv(&[b"PING"])),
    entry!("set", "SET", |cfg| {
        let key = keyed_token(cfg);
        let val = payload(cfg);
        format_argv(&[b"SET", &key, &val])
    }),
    entry!("get", "GET", |cfg| {
        let key = keyed_token(cfg);
        format_argv(&[b"GET", &key])
    }),
    entry!("incr", "INCR", |cfg| {
        let key = keyed_token(cfg);
        format_argv(&[b"INCR", &key])
    }),
    entry!("incrby", "INCRBY", |cfg| {
        let key = keyed_token(cfg);
        let v = cfg.increment.to_string().into_bytes();
        format_argv(&[b"INCRBY", &key, &v])
    }),
    entry!("lpush", "LPUSH", |cfg| {
        let key = keyed_token(cfg);
        let val = payload(cfg);
        format_argv(&[b"LPUSH", &key, &val])
    }),
    entry!("rpush", "RPUSH", |cfg| {
        let key = keyed_token(cfg);
        let val = payload(cfg);
        format_argv(&[b"RPUSH", &key, &val])
    }),
    entry!("lpop", "LPOP", |cfg| {
        let key = keyed_token(cfg);
        format_argv(&[b"LPOP", &key])
    }),
    entry!("rpop", "RPOP", |cfg| {
        let key = keyed_token(cfg);
        format_argv(&[b"RPOP", &key])
    }),
    entry!("sadd", "SADD", |cfg| {
        let key = keyed_token(cfg);
        format_argv(&[b"SADD", &key, b"element"])
    }),
    entry!("zadd", "ZADD", |cfg| {
        let key = keyed_token(cfg);
        let mut argv: Vec<Vec<u8>> = vec![b"ZADD".to_vec(), key];
        for i in 0..cfg.subkey_count {
            argv.push(i.to_string().into_bytes());
            argv.push(format!("element{}", i).into_bytes());
        }
        format_argv(&argv.iter().map(|v| v.as_slice()).collect::<Vec<_>>())
    }),
    entry!("zrange", "ZRANGE", |cfg| {
        let key = keyed_token(cfg);
        format_argv(&[b"ZRANGE", &key, b"0", b"-1", b"WITHSCORES"])
    }),
    entry!("zrangebyscore", "ZRANGEBYSCORE", |cfg| {
        let key = keyed_token(cfg);
        let limit = cfg.increment.to_string().into_bytes();
        format_argv(&[
            b"ZRANGEBYSCORE",
            &key,
            b"-inf",
            b"+inf",
            b"WITHSCORES",
            b"LIMIT",
            b"0",
            &limit,
        ])
    }),
    entry!("zrank", "ZRANK", |cfg| {
        let key = keyed_token(cfg);
        format_argv(&[b"ZRANK", &key, b"element"])
    }),
    entry!("hset", "HSET", |cfg| {
        let key = keyed_token(cfg);
        let val = payload(cfg);
        format_argv(&[b"HSET", &key, b"field", &val])
    }),
    entry!("hget", "HGET", |cfg| {
        let key = keyed_token(cfg);
        format_argv(&[b"HGET", &key, b"field"])
    }),
    entry!("hkeys", "HKEYS", |cfg| {
        let key = keyed_token(cfg);
        format_argv(&[b"HKEYS", &key])
    }),
    entry!("hmset", "HMSET", |cfg| {
        let key = keyed_token(cfg);
        let mut argv: Vec<Vec<u8>> = vec![b"HMSET".to_vec(), key];
        for i in 0..cfg.subkey_count {
            argv.push(format!("field{}", i).into_bytes());
            argv.push(payload(cfg));
        }
        format_argv(&argv.iter().map(|v| v.as_slice()).collect::<Vec<_>>())
    }),
    entry!("hmget", "HMGET", |cfg| {
        let key = keyed_token(cfg);
        let mut argv: Vec<Vec<u8>> = vec![b"HMGET".to_vec(), key];
        for i in 0..cfg.subkey_count {
            argv.push(format!("field{}", i).into_bytes());
        }
        format_argv(&argv.iter().map(|v| v.as_slice()).collect::<Vec<_>>())
    }),
    entry!("hincrby", "HINCRBY", |cfg| {
        let key = keyed_token(cfg);
        let v = cfg.increment.to_string().into_bytes();
        format_argv(&[b"HINCRBY", &key, b"field", &v])
    }),
    entry!("spop", "SPOP", |cfg| {
        let key = keyed_token(cfg);
        format_argv(&[b"SPOP", &key])
    }),
    entry!("lrange_100", "LRANGE_100", |cfg| lrange(cfg, 99)),
    entry!("lrange_300", "LRANGE_300", |cfg| lrange(cfg, 299)),
    entry!("lrange_500", "LRANGE_500", |cfg| lrange(cfg, 499)),
    entry!("lrange_600", "LRANGE_600", |cfg| lrange(cfg, 599)),
    entry!("mset", "MSET", |cfg| {
        let mut argv: Vec<Vec<u8>> = vec![b"MSET".to_vec()];
        for _ in 0..10 {
            argv.push(keyed_token(cfg));
            argv.push(payload(cfg));
        }
        format_argv(&argv.iter().map(|v| v.as_slice()).collect::<Vec<_>>())
    }),
];

fn lrange(cfg: &RunConfig, stop: i64) -> Vec<u8> {
    let key = keyed_token(cfg);
    let stop = stop.to_string().into_bytes();
    format_argv(&[b"LRANGE", &key, b"0", &stop])
}

/// Either a catalog entry or a runtime literal template captured from the
/// CLI tail (`resp-bench ... lpush mylist __rand_int__`).
pub enum TemplateSource {
    Catalog(&'static CatalogEntry),
    Literal { title: String, argv: Vec<Vec<u8>> },
}

impl TemplateSource {
    pub fn title(&self) -> &str {
        match self {
            TemplateSource::Catalog(e) => e.title,
            TemplateSource::Literal { title, .. } => title,
        }
    }

    pub fn build_frame(&self, cfg: &RunConfig) -> Vec<u8> {
        match self {
            TemplateSource::Catalog(e) => (e.build)(cfg),
            TemplateSource::Literal { argv, .. } => {
                format_argv(&argv.iter().map(|v| v.as_slice()).collect::<Vec<_>>())
            }
        }
    }
}

/// Resolves which templates this run will execute: the literal override if
/// the CLI tail supplied one, otherwise every catalog entry whose `name`
/// matches the `-t` filter (or the whole catalog when no filter was given).
pub fn resolve(cfg: &RunConfig) -> Vec<TemplateSource> {
    if let Some((title, argv)) = &cfg.literal_template {
        return vec![TemplateSource::Literal {
            title: title.clone(),
            argv: argv.clone(),
        }];
    }

    CATALOG
        .iter()
        .filter(|e| match &cfg.test_filter {
            TestFilter::All => true,
            TestFilter::Named(names) => names.contains(e.name),
        })
        .map(TemplateSource::Catalog)
        .collect()
}

/// The `-t` test filter: either every catalog entry, or a named subset.
#[derive(Debug, Clone)]
pub enum TestFilter {
    All,
    Named(std::collections::HashSet<String>),
}

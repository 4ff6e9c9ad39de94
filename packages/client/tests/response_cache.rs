mod common;

use std::io::Write;
use std::sync::{Arc, Barrier};
use std::thread;

use common::{handshake, open_cache, url};
use stash_client::cache::disk::{BODY_SLOT, DiskStore, FsDiskStore, METADATA_SLOT, SLOT_COUNT};
use stash_client::prelude::*;

fn stored(method: Method, target: &str, body: &'static str) -> HttpResponse {
    HttpResponse::new(HttpRequest::new(method, url(target)))
        .status(StatusCode::CREATED)
        .message("Created")
        .header("Content-Type", "application/json")
        .header("X-Trace", "one")
        .header("X-Trace", "two")
        .body(body)
}

#[test]
fn get_and_post_round_trip() {
    let (_dir, cache) = open_cache();

    for method in [Method::GET, Method::POST] {
        let response = stored(method.clone(), "http://example.com/items?page=1", "{\"n\":1}");
        cache.put(&response);

        let hit = cache
            .get(&HttpRequest::new(method.clone(), url("http://example.com/items?page=1")))
            .unwrap_or_else(|| panic!("{method} response was not stored"));
        assert_eq!(hit.status_code(), StatusCode::CREATED);
        assert_eq!(hit.status_message(), "Created");
        assert_eq!(hit.header_list(), response.header_list());
        assert_eq!(hit.request().method(), &method);
        assert_eq!(hit.received_at(), response.received_at());
        assert_eq!(hit.into_body().into_string().unwrap(), "{\"n\":1}");
    }

    assert_eq!(cache.stats().snapshot().writes, 2);
}

#[test]
fn methods_do_not_share_entries() {
    let (_dir, cache) = open_cache();
    cache.put(&stored(Method::POST, "http://example.com/search", "posted"));
    assert!(cache.get(&HttpRequest::get(url("http://example.com/search"))).is_none());
}

#[test]
fn put_and_delete_are_not_written() {
    let (_dir, cache) = open_cache();
    for method in [Method::PUT, Method::DELETE, Method::PATCH] {
        let response = stored(method.clone(), "http://example.com/items/1", "x");
        cache.put(&response);
        assert!(cache.get(response.request()).is_none());
    }
    let stats = cache.stats().snapshot();
    assert_eq!(stats.writes, 0);
    assert_eq!(stats.write_skips, 3);
}

#[test]
fn vary_star_is_never_written() {
    let (_dir, cache) = open_cache();
    let response = stored(Method::GET, "http://example.com/personal", "mine").header("Vary", "*");
    cache.put(&response);
    assert!(cache.get(response.request()).is_none());
}

#[test]
fn vary_headers_are_stored_but_not_enforced() {
    let (_dir, cache) = open_cache();
    let request = HttpRequest::get(url("http://example.com/greeting"))
        .header("Accept-Language", "fr-CA")
        .header("Accept", "text/plain");
    cache.put(
        &HttpResponse::new(request)
            .header("Vary", "Accept-Language")
            .body("bonjour"),
    );

    let english = HttpRequest::get(url("http://example.com/greeting")).header("Accept-Language", "en-US");
    let hit = cache.get(&english).unwrap();
    assert_eq!(hit.request().headers().get("Accept-Language"), Some("fr-CA"));
    assert!(!hit.request().headers().contains("Accept"));
    assert_eq!(hit.into_body().into_string().unwrap(), "bonjour");
}

#[test]
fn secure_responses_keep_their_handshake() {
    let (_dir, cache) = open_cache();
    let handshake = handshake();
    let response = stored(Method::GET, "https://api.example.com/me", "{}").handshake(Some(handshake.clone()));
    cache.put(&response);

    let hit = cache.get(response.request()).unwrap();
    assert_eq!(hit.tls_handshake(), Some(&handshake));
    assert_eq!(hit.tls_handshake().unwrap().peer_certificates.len(), 2);
}

#[test]
fn secure_response_without_handshake_is_skipped() {
    let (_dir, cache) = open_cache();
    let response = stored(Method::GET, "https://api.example.com/me", "{}");
    cache.put(&response);
    assert!(cache.get(response.request()).is_none());
    assert_eq!(cache.stats().snapshot().write_skips, 1);
}

#[test]
fn header_with_line_break_is_skipped_not_forged() {
    let (_dir, cache) = open_cache();
    let response = stored(Method::GET, "http://example.com/forged", "x")
        .header("X-A", "v\nStash-Received-Millis: 999")
        .received_at_millis(2);
    cache.put(&response);

    assert!(cache.get(response.request()).is_none());
    let stats = cache.stats().snapshot();
    assert_eq!(stats.writes, 0);
    assert_eq!(stats.write_skips, 1);
}

#[test]
fn access_token_never_reaches_disk() {
    let (dir, cache) = open_cache();
    let response = stored(
        Method::GET,
        "http://example.com/feed?access_token=SECRET123&page=2",
        "feed",
    );
    cache.put(&response);

    assert!(cache.get(&HttpRequest::get(url("http://example.com/feed?page=2"))).is_some());
    for entry in std::fs::read_dir(dir.path()).unwrap() {
        let contents = std::fs::read(entry.unwrap().path()).unwrap();
        assert!(
            !contents.windows(9).any(|w| w == b"SECRET123"),
            "token was written to disk"
        );
    }
}

#[test]
fn open_writer_blocks_second_put_without_damage() {
    let dir = tempfile::tempdir().unwrap();
    let config = CacheConfig::in_directory(dir.path());
    let store = Arc::new(FsDiskStore::open(dir.path(), config.format_version, SLOT_COUNT, config.max_size_bytes).unwrap());
    let cache = ResponseCache::with_store(store.clone(), &config);

    let first = stored(Method::GET, "http://example.com/race", "first");
    cache.put(&first);

    let key = cache.key_for(first.request());
    let mut editor = store.edit(key.hash_key()).unwrap().unwrap();

    cache.put(&stored(Method::GET, "http://example.com/race", "second"));
    assert_eq!(cache.stats().snapshot().write_skips, 1);

    editor.new_output_stream(METADATA_SLOT).unwrap().write_all(b"garbage").unwrap();
    editor.new_output_stream(BODY_SLOT).unwrap().write_all(b"garbage").unwrap();
    editor.abort().unwrap();

    let hit = cache.get(first.request()).unwrap();
    assert_eq!(hit.into_body().into_string().unwrap(), "first");
}

#[test]
fn concurrent_puts_leave_one_valid_entry() {
    const WRITERS: usize = 8;
    const BODIES: [&str; WRITERS] = ["a", "bb", "ccc", "dddd", "eeeee", "ffffff", "ggggggg", "hhhhhhhh"];

    let (_dir, cache) = open_cache();
    let barrier = Arc::new(Barrier::new(WRITERS));

    let handles: Vec<_> = BODIES
        .iter()
        .map(|&body| {
            let cache = Arc::clone(&cache);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                cache.put(&stored(Method::GET, "http://example.com/contended", body));
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let stats = cache.stats().snapshot();
    assert!(stats.writes >= 1);
    assert_eq!(stats.writes + stats.write_skips, WRITERS as u64);
    assert_eq!(stats.write_aborts, 0);

    let hit = cache.get(&HttpRequest::get(url("http://example.com/contended"))).unwrap();
    let body = hit.into_body().into_string().unwrap();
    assert!(BODIES.contains(&body.as_str()), "unexpected body {body:?}");
}

#[test]
fn cached_body_outlives_replacement() {
    let (_dir, cache) = open_cache();
    let request = HttpRequest::get(url("http://example.com/doc"));
    cache.put(&HttpResponse::new(request.clone()).body("version one"));

    let held = cache.get(&request).unwrap();
    cache.put(&HttpResponse::new(request.clone()).body("version two"));
    assert!(cache.remove(&request));

    assert_eq!(held.into_body().into_string().unwrap(), "version one");
    assert!(cache.get(&request).is_none());
}

#[test]
fn format_version_bump_discards_entries() {
    let dir = tempfile::tempdir().unwrap();
    let request = HttpRequest::get(url("http://example.com/v"));

    let config = CacheConfig::in_directory(dir.path());
    ResponseCache::open(&config).put(&HttpResponse::new(request.clone()).body("v1"));
    assert!(ResponseCache::open(&config).get(&request).is_some());

    let bumped = CacheConfig {
        format_version: config.format_version + 1,
        ..config
    };
    assert!(ResponseCache::open(&bumped).get(&request).is_none());
}

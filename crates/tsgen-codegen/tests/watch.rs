//! Watch engine over a real source directory.

use std::fs;
use std::thread;
use std::time::{Duration, Instant};

use tempfile::tempdir;
use tsgen_codegen::{ChangeEvent, Config, RustSource, WatchEngine};

fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    false
}

#[test]
fn edits_regenerate_only_affected_files() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("src");
    let out = dir.path().join("types");
    fs::create_dir_all(&src).unwrap();
    let user = src.join("user.rs");
    fs::write(&user, "#[derive(TypeScript)] pub struct User { pub name: String }").unwrap();
    fs::write(
        src.join("order.rs"),
        "#[derive(TypeScript)] #[ts(namespace = \"Shop\")] pub struct Order { pub id: u64 }",
    )
    .unwrap();

    let config = Config {
        output_path: out.clone(),
        debounce_ms: 200,
        ..Config::default()
    };
    let engine = WatchEngine::new(RustSource::new(&src), config);
    let queue = engine.queue();
    let cancel = engine.cancellation();
    let handle = engine.spawn().unwrap();

    assert!(wait_until(|| queue.is_accepting()));
    let user_file = out.join("User.type.ts");
    let shop_file = out.join("Shop.d.ts");
    assert!(fs::read_to_string(&user_file).unwrap().contains("name: string;"));
    let shop_before = fs::metadata(&shop_file).unwrap().modified().unwrap();

    // Several saves in a row are processed as one change.
    for nick in ["a", "ab", "abc"] {
        fs::write(
            &user,
            format!(
                "#[derive(TypeScript)] pub struct User {{ pub name: String, pub {nick}: bool }}"
            ),
        )
        .unwrap();
        assert!(queue.push(ChangeEvent::changed(&user)));
    }
    assert!(wait_until(|| {
        fs::read_to_string(&user_file).is_ok_and(|text| text.contains("abc: boolean;"))
    }));

    fs::remove_file(&user).unwrap();
    queue.push(ChangeEvent::deleted(&user));
    assert!(wait_until(|| !user_file.exists()));

    cancel.cancel();
    let outcome = handle.join().unwrap();
    assert!(outcome.success, "{:?}", outcome.diagnostics);
    assert_eq!(outcome.passes, 3);
    assert_eq!(fs::metadata(&shop_file).unwrap().modified().unwrap(), shop_before);
}

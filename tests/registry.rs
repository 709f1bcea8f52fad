use collagist::layout::{FreeFormLayout, LayoutGeometry, SlotRect};
use collagist::registry::{builtin, JsonFileStore, LayoutRegistry, Resolution};
use collagist::Error;

use std::fs;
use std::path::PathBuf;

fn scratch(name: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    dir.push(format!("collagist-registry-{}-{name}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn two_up() -> LayoutGeometry {
    FreeFormLayout::new(
        (1286, 652),
        vec![SlotRect::new(36, 36, 586, 397), SlotRect::new(664, 36, 586, 397)],
    )
    .into()
}

#[test]
fn appended_layouts_survive_restarts() {
    let dir = scratch("restart");
    let path = dir.join("kiosk").join("layouts.json");

    let first = LayoutRegistry::open(JsonFileStore::new(&path)).unwrap();
    first.append("Custom_Custom1", two_up()).unwrap();
    assert!(path.is_file());
    drop(first);

    let second = LayoutRegistry::open(JsonFileStore::new(&path))
        .unwrap()
        .with_resolution(Resolution::Strict);
    assert_eq!(second.resolve("Custom_Custom1").unwrap(), two_up());
    assert_eq!(second.resolve("2x2").unwrap(), builtin("2x2").unwrap());
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn reload_picks_up_layouts_added_elsewhere() {
    let dir = scratch("reload");
    let path = dir.join("layouts.json");
    let writer = LayoutRegistry::open(JsonFileStore::new(&path)).unwrap();
    let reader = LayoutRegistry::open(JsonFileStore::new(&path)).unwrap();

    writer.append("Custom_Custom1", two_up()).unwrap();
    assert!(!reader.contains("Custom_Custom1"));
    assert_eq!(reader.reload().unwrap(), 1);
    assert!(reader.contains("Custom_Custom1"));

    // an append through the second registry keeps the first one's entry
    reader.append("Custom_Custom2", two_up()).unwrap();
    writer.reload().unwrap();
    assert_eq!(
        writer.custom_names(),
        vec!["Custom_Custom1".to_string(), "Custom_Custom2".to_string()]
    );
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn stored_json_uses_the_documented_shape() {
    let dir = scratch("shape");
    let path = dir.join("layouts.json");
    let registry = LayoutRegistry::open(JsonFileStore::new(&path)).unwrap();
    registry.append("Custom_Custom1", two_up()).unwrap();

    let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    let entry = &value["customLayouts"][0];
    assert_eq!(entry["name"], "Custom_Custom1");
    assert_eq!(entry["geometry"]["canvasWidth"], 1286);
    assert_eq!(entry["geometry"]["slots"][1]["x"], 664);
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn hand_written_store_is_read() {
    let dir = scratch("hand");
    let path = dir.join("layouts.json");
    fs::write(
        &path,
        r#"{
          "customLayouts": [
            { "name": "wide",
              "geometry": { "canvasWidth": 1286, "canvasHeight": 652,
                            "slots": [ {"x":36,"y":36,"width":586,"height":397},
                                       {"x":664,"y":36,"width":586,"height":397} ] } },
            { "name": "tall-grid",
              "geometry": { "canvasWidth": 551, "canvasHeight": 1517,
                            "padTop": 48, "padBottom": 186, "padLeft": 53, "padRight": 53,
                            "gap": 32, "rows": 4, "columns": 1 } },
            { "name": "broken",
              "geometry": { "canvasWidth": 10, "canvasHeight": 10,
                            "slots": [ {"x":5,"y":5,"width":10,"height":10} ] } }
          ]
        }"#,
    )
    .unwrap();
    let registry = LayoutRegistry::open(JsonFileStore::new(&path)).unwrap();
    assert_eq!(registry.resolve_strict("wide").unwrap(), two_up());
    assert_eq!(registry.resolve_strict("tall-grid").unwrap(), builtin("4x1").unwrap());
    assert!(!registry.contains("broken"));
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn malformed_store_keeps_the_current_table() {
    let dir = scratch("malformed");
    let path = dir.join("layouts.json");
    let registry = LayoutRegistry::open(JsonFileStore::new(&path)).unwrap();
    registry.append("Custom_Custom1", two_up()).unwrap();

    fs::write(&path, "{ not json").unwrap();
    assert!(matches!(registry.reload(), Err(Error::StoreDeser(_, _))));
    assert!(registry.contains("Custom_Custom1"));
    assert!(LayoutRegistry::open(JsonFileStore::new(&path)).is_err());
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn concurrent_readers_see_whole_tables() {
    let registry = std::sync::Arc::new(LayoutRegistry::in_memory());
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let registry = registry.clone();
            std::thread::spawn(move || {
                for _ in 0..200 {
                    let all = registry.list_all();
                    assert!(all.len() >= 4);
                    assert_eq!(registry.resolve_lenient("2x2"), builtin("2x2").unwrap());
                }
            })
        })
        .collect();
    for i in 0..20 {
        registry.append(format!("custom-{i}"), two_up()).unwrap();
    }
    for r in readers {
        r.join().unwrap();
    }
    assert_eq!(registry.custom_names().len(), 20);
}

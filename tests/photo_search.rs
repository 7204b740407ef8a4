mod common;

use common::*;
use cookly::{
  detector::DetectOutcome,
  search::{MODEL_UNAVAILABLE_MESSAGE, NO_PRODUCTS_MESSAGE, RecipeSearch},
  upload::UploadError,
};

#[test]
fn corpus_is_ordered_newest_first() {
  let ws = Workspace::new();
  let ids: Vec<u64> = ws.corpus.iter().map(|r| r.id).collect();
  assert_eq!(ids, [2, 1, 3]);
}

#[test]
fn photo_with_two_products_finds_stew() {
  let ws = Workspace::new();
  let detector = ws.detector(vec![item(0, 0.9), item(0, 0.6), item(1, 0.8), item(2, 0.1)]);
  let search = RecipeSearch::new(&detector, &ws.corpus, &ws.config.normalizer, 0.25);

  let response = search.photo(&ws.photo);
  assert!(response.success);
  assert_eq!(response.message, "Найдено 2 продуктов и 1 подходящих рецептов");
  assert_eq!(response.total_products, 2);
  assert_eq!(response.total_recipes, 1);

  let names: Vec<&str> = response
    .detected_products
    .iter()
    .map(|p| p.name.as_str())
    .collect();
  assert_eq!(names, ["картофель", "морковь"]);
  let carrot = &response.detected_products[1];
  assert_eq!(carrot.count, 2);
  assert_eq!(carrot.max_confidence, 0.9);
  assert!((carrot.confidence - 0.75).abs() < 1e-9);

  let stew = &response.recipes[0];
  assert_eq!(stew.recipe.id, 1);
  assert_eq!(stew.match_score, 100.0);
  assert_eq!(stew.matched_products, ["картофель", "морковь"]);
}

#[test]
fn partial_matches_are_ranked_by_score() {
  let ws = Workspace::new();
  let detector = ws.detector(vec![item(0, 0.9), item(1, 0.8), item(2, 0.7)]);
  let search = RecipeSearch::new(&detector, &ws.corpus, &ws.config.normalizer, 0.25);

  let response = search.photo(&ws.photo);
  let scores: Vec<(u64, f64)> = response
    .recipes
    .iter()
    .map(|r| (r.recipe.id, r.match_score))
    .collect();
  assert_eq!(scores, [(1, 66.7), (2, 33.3)]);
}

#[test]
fn response_serializes_with_camel_case_and_recipe_fields() {
  let ws = Workspace::new();
  let detector = ws.detector(vec![item(0, 0.9), item(1, 0.8)]);
  let search = RecipeSearch::new(&detector, &ws.corpus, &ws.config.normalizer, 0.25);

  let json = serde_json::to_value(search.photo(&ws.photo)).unwrap();
  assert_eq!(json["success"], true);
  assert_eq!(json["totalProducts"], 2);
  assert_eq!(json["totalRecipes"], 1);
  assert_eq!(json["detectedProducts"][0]["name"], "морковь");
  assert_eq!(json["detectedProducts"][0]["maxConfidence"], 0.9);
  assert_eq!(json["detectedProducts"][1]["maxConfidence"], 0.8);

  let recipe = &json["recipes"][0];
  assert_eq!(recipe["title"], "Рагу");
  assert_eq!(recipe["image"], "ragu.jpg");
  assert_eq!(recipe["matchScore"], 100.0);
  assert_eq!(recipe["matchedProducts"][0], "картофель");
}

#[test]
fn products_without_recipes_report_no_match() {
  let ws = Workspace::new();
  let detector = ws.detector(vec![item(0, 0.9)]);
  let search = RecipeSearch::new(&detector, &[], &ws.config.normalizer, 0.25);

  let response = search.photo(&ws.photo);
  assert!(response.success);
  assert_eq!(response.message, "Найдено 1 продуктов, но подходящих рецептов нет");
  assert_eq!(response.total_products, 1);
  assert!(response.recipes.is_empty());
}

#[test]
fn empty_photo_is_a_successful_empty_answer() {
  let ws = Workspace::new();
  let detector = ws.detector(vec![item(0, 0.1)]);
  let search = RecipeSearch::new(&detector, &ws.corpus, &ws.config.normalizer, 0.25);

  let response = search.photo(&ws.photo);
  assert!(response.success);
  assert_eq!(response.message, NO_PRODUCTS_MESSAGE);
  assert!(response.detected_products.is_empty());
  assert!(response.recipes.is_empty());
}

#[test]
fn missing_model_fails_without_results() {
  let mut ws = Workspace::new();
  ws.config.model_path = ws.dir.path().join("absent.onnx");
  let detector = cookly::detector::Detector::new(&ws.config);
  let search = RecipeSearch::new(&detector, &ws.corpus, &ws.config.normalizer, 0.25);

  let response = search.photo(&ws.photo);
  assert!(!response.success);
  assert_eq!(response.message, MODEL_UNAVAILABLE_MESSAGE);
  assert!(!detector.status().loaded);
}

#[test]
fn broken_image_reports_processing_error() {
  let ws = Workspace::new();
  let detector = ws.detector(vec![item(0, 0.9)]);
  let search = RecipeSearch::new(&detector, &ws.corpus, &ws.config.normalizer, 0.25);

  let response = search
    .upload(&ws.config.upload, "broken.png", b"definitely not a png")
    .unwrap();
  assert!(!response.success);
  assert!(response.message.starts_with("Ошибка обработки: "));
  assert_eq!(ws.leftover_uploads(), 0);
}

#[test]
fn upload_is_removed_after_search() {
  let ws = Workspace::new();
  let detector = ws.detector(vec![item(0, 0.9), item(1, 0.8)]);
  let search = RecipeSearch::new(&detector, &ws.corpus, &ws.config.normalizer, 0.25);

  let bytes = std::fs::read(&ws.photo).unwrap();
  let response = search.upload(&ws.config.upload, "fridge.PNG", &bytes).unwrap();
  assert!(response.success);
  assert_eq!(response.total_recipes, 1);
  assert!(ws.upload_dir().exists());
  assert_eq!(ws.leftover_uploads(), 0);
}

#[test]
fn upload_is_decoded_by_contents_not_extension() {
  let ws = Workspace::new();
  let detector = ws.detector(vec![item(0, 0.9), item(1, 0.8)]);
  let search = RecipeSearch::new(&detector, &ws.corpus, &ws.config.normalizer, 0.25);

  // PNG 数据以 .jpg 名称上传
  let bytes = std::fs::read(&ws.photo).unwrap();
  let response = search.upload(&ws.config.upload, "fridge.jpg", &bytes).unwrap();
  assert!(response.success, "{}", response.message);
  assert_eq!(response.total_products, 2);
  assert_eq!(ws.leftover_uploads(), 0);
}

#[test]
fn detect_report_keeps_every_box() {
  let ws = Workspace::new();
  let detector = ws.detector(vec![item(0, 0.9), item(0, 0.6), item(1, 0.8)]);
  let search = RecipeSearch::new(&detector, &[], &ws.config.normalizer, 0.25);

  let report = search.detect(&ws.photo);
  assert!(report.success);
  assert_eq!(report.detections.len(), 3);
  assert_eq!(report.detected_products.len(), 2);

  let json = serde_json::to_value(&report).unwrap();
  assert_eq!(json["detections"][0]["bbox"], serde_json::json!([4, 4, 40, 30]));
  assert_eq!(json["detections"][0]["area"], 36 * 26);
  assert_eq!(json["detectedProducts"][0]["name"], "картофель");

  let empty = RecipeSearch::new(&ws.detector(vec![]), &[], &ws.config.normalizer, 0.25)
    .detect(&ws.photo);
  assert!(empty.success);
  assert_eq!(empty.message, NO_PRODUCTS_MESSAGE);
  assert!(empty.detections.is_empty());
}

#[test]
fn upload_with_wrong_extension_is_rejected() {
  let ws = Workspace::new();
  let detector = ws.detector(vec![item(0, 0.9)]);
  let search = RecipeSearch::new(&detector, &ws.corpus, &ws.config.normalizer, 0.25);

  let err = search
    .upload(&ws.config.upload, "fridge.bmp", b"BM")
    .unwrap_err();
  assert!(matches!(
    err,
    cookly::search::SearchError::UploadError(UploadError::ExtensionNotAllowed(_))
  ));
  assert_eq!(ws.leftover_uploads(), 0);
}

#[test]
fn concurrent_detections_share_one_model() {
  let ws = Workspace::new();
  let detector = &ws.detector(vec![item(0, 0.9), item(1, 0.8)]);
  let photo = ws.photo.as_path();

  std::thread::scope(|s| {
    let handles: Vec<_> = (0..4)
      .map(|_| s.spawn(move || detector.detect(photo, 0.25)))
      .collect();
    for handle in handles {
      let outcome = handle.join().unwrap();
      let DetectOutcome::Detected { stats, .. } = outcome else {
        panic!("expected detections");
      };
      assert_eq!(stats.len(), 2);
    }
  });
}

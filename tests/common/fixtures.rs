use std::path::{Path, PathBuf};

use cookly::{
  config::Config,
  detector::{Detector, ModelLoader},
  model::{DetectItem, DetectResult, Model, ModelError},
  recipe::{Recipe, load_corpus},
};
use image::{ImageBuffer, Rgb, RgbImage};
use tempfile::TempDir;

pub const CLASS_NAMES: &str = r#"["carrot", "potato", "onion"]"#;

pub const CORPUS: &str = r#"[
  {
    "id": 1,
    "title": "Рагу",
    "ingredients": [
      {"name": "Морковь", "amount": "2 шт"},
      {"name": "Картофель 3 шт", "amount": "3 шт"},
      {"name": "Соль"}
    ],
    "created_at": "2024-03-01T10:00:00Z",
    "image": "ragu.jpg"
  },
  {
    "id": 2,
    "title": "Луковый суп",
    "ingredients": [
      {"name": "Лук репчатый", "amount": "4 шт"},
      {"name": "Сливочное масло", "amount": "50 г"}
    ],
    "created_at": "2024-05-01T10:00:00Z"
  },
  {
    "id": 3,
    "title": "Торт",
    "ingredients": [
      {"name": "Мука", "amount": "300 г"},
      {"name": "Сахар", "amount": "200 г"}
    ],
    "created_at": "2024-01-01T10:00:00Z"
  }
]"#;

/// 返回固定检测框的模型
pub struct FixedModel {
  pub items: Vec<DetectItem>,
}

impl Model for FixedModel {
  fn infer(&mut self, _image: &RgbImage, _threshold: f32) -> Result<DetectResult, ModelError> {
    Ok(self.items.clone().into())
  }
}

pub fn item(class_id: u32, score: f32) -> DetectItem {
  DetectItem {
    class_id,
    score,
    bbox: [4.0, 4.0, 40.0, 30.0],
  }
}

pub fn fixed_loader(items: Vec<DetectItem>) -> ModelLoader {
  Box::new(move |_path: &Path| {
    Ok(Box::new(FixedModel {
      items: items.clone(),
    }) as Box<dyn Model>)
  })
}

/// 测试环境：模型文件、类别文件、菜谱语料与一张照片
pub struct Workspace {
  pub dir: TempDir,
  pub config: Config,
  pub photo: PathBuf,
  pub corpus: Vec<Recipe>,
}

impl Workspace {
  pub fn new() -> Self {
    let dir = TempDir::new().expect("Failed to create temp directory");

    let model_path = dir.path().join("vegetable_detector.onnx");
    std::fs::write(&model_path, vec![0u8; 4096]).expect("Failed to write model");
    let class_names_path = dir.path().join("class_names.json");
    std::fs::write(&class_names_path, CLASS_NAMES).expect("Failed to write class names");
    let corpus_path = dir.path().join("recipes.json");
    std::fs::write(&corpus_path, CORPUS).expect("Failed to write corpus");

    let photo = dir.path().join("fridge.png");
    ImageBuffer::from_fn(64, 48, |_, _| Rgb([200u8, 120u8, 30u8]))
      .save_with_format(&photo, image::ImageFormat::Png)
      .expect("Failed to save test image");

    let mut config = Config {
      model_path,
      class_names_path,
      ..Config::default()
    };
    config.upload.dir = Some(dir.path().join("uploads"));

    let corpus = load_corpus(&corpus_path).expect("Failed to load corpus");
    Workspace {
      dir,
      config,
      photo,
      corpus,
    }
  }

  pub fn detector(&self, items: Vec<DetectItem>) -> Detector {
    Detector::with_loader(&self.config, fixed_loader(items))
  }

  pub fn upload_dir(&self) -> PathBuf {
    self.dir.path().join("uploads")
  }

  /// 上传目录中残留的文件数
  pub fn leftover_uploads(&self) -> usize {
    std::fs::read_dir(self.upload_dir())
      .map(|entries| entries.count())
      .unwrap_or(0)
  }
}

//! Resume-after-sign-in flow: cached photo, sign in, generate, save

use foodsnap::auth::AuthService;
use foodsnap::cache::{CachePolicy, ImageCache};
use foodsnap::clock::ManualClock;
use foodsnap::pipeline::{MultipartPart, RefreshPolicy, RequestBody};
use foodsnap::recipes::{Recipe, RecipeClient, RecipeOutcome};
use foodsnap::{ClientError, ImageFile};

use crate::integration::test_utils::{ok, pipeline_with, ScriptedTransport};

const RECIPE_ANALYSIS: &str = r#"{
    "filename": "lunch.jpg",
    "analysis": {
        "dish_name": "Omelette",
        "ingredients": ["eggs", "butter"],
        "recipe": "Whisk eggs\nMelt butter\nCook"
    }
}"#;

const NOT_FOOD_ANALYSIS: &str = r#"{
    "filename": "cat.jpg",
    "analysis": {"message": "Not food", "description": "A sleeping cat"}
}"#;

fn signed_in_routes(transport: &std::sync::Arc<ScriptedTransport>) {
    transport
        .on("/auth/token", ok(200, r#"{"access_token":"t1","token_type":"bearer"}"#))
        .on("/auth/me", ok(200, r#"{"id":1,"username":"ann"}"#));
}

fn cache_with_photo(storage: &foodsnap::storage::Storage) -> ImageCache {
    let cache = ImageCache::new(
        storage.clone(),
        ManualClock::shared(0),
        CachePolicy::default(),
    );
    assert!(cache.store(&ImageFile::new("lunch.jpg", "image/jpeg", vec![9; 512])));
    cache
}

#[tokio::test]
async fn test_generated_recipe_clears_cache() {
    let transport = ScriptedTransport::new();
    signed_in_routes(&transport);
    transport.on("/dish/", ok(200, RECIPE_ANALYSIS));
    let (pipeline, _tokens, storage) = pipeline_with(transport.clone(), RefreshPolicy::PerRequest);
    let cache = cache_with_photo(&storage);

    AuthService::new(pipeline.clone())
        .sign_in("ann", "pw")
        .await
        .unwrap();
    let generated = RecipeClient::new(pipeline)
        .generate_from_cache(&cache, Some("Lisbon"))
        .await
        .unwrap();

    assert_eq!(generated.file.name, "lunch.jpg");
    assert_eq!(generated.file.bytes, vec![9; 512]);
    match generated.outcome {
        RecipeOutcome::Recipe(recipe) => assert_eq!(recipe.dish_name, "Omelette"),
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert!(!cache.has_valid());
    assert_eq!(cache.previews().live_count(), 0);

    let upload = transport
        .sent()
        .into_iter()
        .find(|r| r.url.ends_with("/dish/"))
        .unwrap();
    assert_eq!(upload.header("Authorization"), Some("Bearer t1"));
    assert!(upload.header("Content-Type").is_none());
    let RequestBody::Multipart(parts) = upload.body else {
        panic!("expected multipart upload");
    };
    assert!(matches!(
        &parts[0],
        MultipartPart::File { name, file } if name == "file" && file.bytes == vec![9; 512]
    ));
    assert!(matches!(
        &parts[1],
        MultipartPart::Text { name, value } if name == "location" && value == "Lisbon"
    ));
}

#[tokio::test]
async fn test_not_food_keeps_cache() {
    let transport = ScriptedTransport::new();
    signed_in_routes(&transport);
    transport.on("/dish/", ok(200, NOT_FOOD_ANALYSIS));
    let (pipeline, _tokens, storage) = pipeline_with(transport.clone(), RefreshPolicy::PerRequest);
    let cache = cache_with_photo(&storage);

    AuthService::new(pipeline.clone())
        .sign_in("ann", "pw")
        .await
        .unwrap();
    let generated = RecipeClient::new(pipeline)
        .generate_from_cache(&cache, None)
        .await
        .unwrap();

    assert_eq!(
        generated.outcome,
        RecipeOutcome::NotFood {
            description: "A sleeping cat".to_string()
        }
    );
    assert!(cache.has_valid());
    assert_eq!(transport.sent().last().map(|r| match &r.body {
        RequestBody::Multipart(parts) => parts.len(),
        _ => 0,
    }), Some(1));
}

#[tokio::test]
async fn test_failed_generation_keeps_cache() {
    let transport = ScriptedTransport::new();
    signed_in_routes(&transport);
    transport.on(
        "/dish/",
        ok(500, r#"{"detail":"Failed to analyze dish: timeout"}"#),
    );
    let (pipeline, _tokens, storage) = pipeline_with(transport, RefreshPolicy::PerRequest);
    let cache = cache_with_photo(&storage);

    AuthService::new(pipeline.clone())
        .sign_in("ann", "pw")
        .await
        .unwrap();
    let err = RecipeClient::new(pipeline)
        .generate_from_cache(&cache, None)
        .await
        .unwrap_err();

    match err {
        ClientError::PipelineError(inner) => {
            assert_eq!(inner.detail().as_deref(), Some("Failed to analyze dish: timeout"))
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(cache.has_valid());
}

#[tokio::test]
async fn test_empty_cache_is_reported() {
    let transport = ScriptedTransport::new();
    let (pipeline, _tokens, storage) = pipeline_with(transport.clone(), RefreshPolicy::PerRequest);
    let cache = ImageCache::new(storage, ManualClock::shared(0), CachePolicy::default());

    let err = RecipeClient::new(pipeline)
        .generate_from_cache(&cache, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::NothingCached));
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn test_save_returns_recipe_id() {
    let transport = ScriptedTransport::new().on(
        "/dish/save/",
        ok(200, r#"{"message":"Recipe saved successfully","recipe_id":31}"#),
    );
    let (pipeline, _tokens, _storage) = pipeline_with(transport.clone(), RefreshPolicy::PerRequest);

    let recipe = Recipe {
        dish_name: "Omelette".to_string(),
        ingredients: vec!["eggs".to_string()],
        recipe: "Whisk\nCook".to_string(),
    };
    let id = RecipeClient::new(pipeline)
        .save(&ImageFile::new("lunch.jpg", "image/jpeg", vec![1, 2]), &recipe)
        .await
        .unwrap();
    assert_eq!(id, 31);

    let sent = transport.sent();
    let RequestBody::Multipart(parts) = &sent[0].body else {
        panic!("expected multipart upload");
    };
    let MultipartPart::Text { name, value } = &parts[1] else {
        panic!("expected recipe field");
    };
    assert_eq!(name, "recipe");
    let roundtrip: Recipe = serde_json::from_str(value).unwrap();
    assert_eq!(roundtrip, recipe);
}

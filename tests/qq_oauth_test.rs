//! # QQ 登录测试

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use htxp::HtxpError;
use htxp::oauth::{QqConfig, QqProvider};

async fn provider() -> (MockServer, QqProvider) {
    let server = MockServer::start().await;
    let config = QqConfig::new("101000", "app-key", "https://example.com/qq/callback").with_base_url(&server.uri());
    let provider = QqProvider::new(config).unwrap();
    (server, provider)
}

#[tokio::test]
async fn access_token_parses_form_body() {
    let (server, provider) = provider().await;
    Mock::given(method("GET"))
        .and(path("/oauth2.0/token"))
        .and(query_param("grant_type", "authorization_code"))
        .and(query_param("client_id", "101000"))
        .and(query_param("client_secret", "app-key"))
        .and(query_param("code", "AUTH-CODE"))
        .and(query_param("redirect_uri", "https://example.com/qq/callback"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("access_token=FE04A1&expires_in=7776000&refresh_token=88E4BE"),
        )
        .mount(&server)
        .await;

    let info = provider.access_token("AUTH-CODE").await.unwrap();
    assert_eq!(info.access_token, "FE04A1");
    assert_eq!(info.expires_in, "7776000");
    assert_eq!(info.refresh_token, "88E4BE");
}

#[tokio::test]
async fn access_token_error_is_surfaced() {
    let (server, provider) = provider().await;
    Mock::given(method("GET"))
        .and(path("/oauth2.0/token"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "callback( {\"error\":100019,\"error_description\":\"code to access token error\"} );",
        ))
        .mount(&server)
        .await;

    let err = provider.access_token("used-code").await.unwrap_err();
    assert!(matches!(err, HtxpError::OAuth { .. }));
    assert!(err.to_string().contains("100019"));
}

#[tokio::test]
async fn open_id_parses_jsonp() {
    let (server, provider) = provider().await;
    Mock::given(method("GET"))
        .and(path("/oauth2.0/me"))
        .and(query_param("access_token", "FE04A1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "callback( {\"client_id\":\"101000\",\"openid\":\"6A2B9D0A1F3C4E5D6A2B9D0A1F3C4E5D\"} );\n",
        ))
        .mount(&server)
        .await;

    assert_eq!(
        provider.open_id("FE04A1").await.unwrap(),
        "6A2B9D0A1F3C4E5D6A2B9D0A1F3C4E5D"
    );
}

#[tokio::test]
async fn open_id_error_is_surfaced() {
    let (server, provider) = provider().await;
    Mock::given(method("GET"))
        .and(path("/oauth2.0/me"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "callback( {\"error\":100016,\"error_description\":\"access token check failed\"} );",
        ))
        .mount(&server)
        .await;

    assert!(provider.open_id("bad").await.is_err());
}

#[tokio::test]
async fn user_info_success_and_failure() {
    let (server, provider) = provider().await;
    Mock::given(method("GET"))
        .and(path("/user/get_user_info"))
        .and(query_param("openid", "OPENID"))
        .and(query_param("oauth_consumer_key", "101000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ret": 0,
            "msg": "",
            "nickname": "小明",
            "figureurl": "http://qzapp.qlogo.cn/30",
            "figureurl_1": "http://qzapp.qlogo.cn/50",
            "figureurl_2": "http://qzapp.qlogo.cn/100",
            "gender": "男",
            "vip": "0",
            "level": "0"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/user/get_user_info"))
        .and(query_param("openid", "EXPIRED"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ret": 100030,
            "msg": "this api without user authorization"
        })))
        .mount(&server)
        .await;

    let info = provider.user_info("FE04A1", "OPENID").await.unwrap();
    assert_eq!(info.nickname, "小明");
    assert_eq!(info.figureurl2, "http://qzapp.qlogo.cn/100");

    let err = provider.user_info("FE04A1", "EXPIRED").await.unwrap_err();
    assert!(err.to_string().contains("100030"));
}

use std::time::Duration;

use serde_json::json;
use tracing_subscriber::EnvFilter;
use volley::{
    HttpConfig, Reporter, RetryPolicy, Scenario, Session, ShapeExecutor, WaitTime,
    report::{StdoutReporter, SummaryReport},
    shape::ProfileBuilder,
    transport::Method,
};

// One iteration of a user: log in, then read the profile with retries
async fn login_and_get_profile(session: Session) {
    let Ok(login) = session
        .http("User Login")
        .method(Method::Post)
        .path("/auth/login")
        .form([("username", "testuser"), ("password", "testpass")])
        .send()
        .await
    else {
        return;
    };
    if !login.validator().json_contains("access_token").validate() {
        tracing::error!("Login failed - no access token in response");
        return;
    }
    let token = login
        .get("access_token")
        .and_then(|v| v.as_str())
        .unwrap_or_default();

    let Ok(policy) = RetryPolicy::new(3, Duration::from_secs(1), 2.0) else {
        return;
    };
    let profile = session
        .http("Get User Profile")
        .path("/users/profile")
        .header("Authorization", format!("Bearer {token}"))
        .retry(policy.with_retryable_statuses([500, 502, 503]))
        .send()
        .await;

    match profile {
        Ok(reply) => {
            let mut validator = reply.validator();
            validator
                .status_is(200)
                .has_header("Content-Type")
                .json_matches(&json!({"status": "active"}))
                .json_contains("id");
            if !validator.validate() {
                tracing::error!(failed = ?validator.failures().collect::<Vec<_>>(), "Failed to get user profile");
            }
        }
        Err(err) => tracing::error!(%err, "Profile request gave up"),
    }

    let _ = session
        .http("Search Users")
        .path("/users/search")
        .queries([("page", "1"), ("limit", "10"), ("sort", "name")])
        .header("Authorization", format!("Bearer {token}"))
        .timeout(Duration::from_secs(10))
        .disable_response_logging()
        .send()
        .await;
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Spike to 10 users, ramp to 20, drop to a steady 5, then stress from 5 to 15
    let profile = ProfileBuilder::new()
        .spike(10)
        .ramp_up(20, Duration::from_secs(10))?
        .steady_users(5, Duration::from_secs(5))
        .stress_ramp(5, 15, Duration::from_secs(10))?
        .build();

    let results = Scenario::builder()
        .name("Users API")
        .http(
            HttpConfig::builder()
                .base_uri("http://localhost:8000")
                .log_responses(false)
                .build(),
        )
        .action(login_and_get_profile)
        .executor(
            ShapeExecutor::builder()
                .scheduler(profile)
                .wait_time(WaitTime::between(
                    Duration::from_secs(1),
                    Duration::from_secs(3),
                )?)
                .build(),
        )
        .build()
        .run()
        .await?;

    StdoutReporter.report(SummaryReport::from(results)).await?;
    Ok(())
}

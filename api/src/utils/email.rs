use anyhow::{anyhow, Context, Result};
use postmark::{
    api::email::{SendEmailWithTemplateRequest, SendEmailWithTemplateRequestBuilder},
    reqwest::PostmarkClient,
    Query,
};
use serde::Serialize;
use std::{collections::HashMap, env};

pub async fn send<Q, T, E>(req: Q) -> Result<T>
where
    Q: Query<PostmarkClient, Result = std::result::Result<T, E>> + Send,
{
    let client = PostmarkClient::builder()
        .token(env::var("POSTMARK_TOKEN").context("POSTMARK_TOKEN not set")?)
        .build();

    req.execute(&client)
        .await
        .map_err(|_| anyhow!("Could not send email"))
}

#[allow(clippy::type_complexity)]
pub fn from_template<S, V>(
    template_id: S,
    params: HashMap<S, V>,
) -> Result<
    SendEmailWithTemplateRequestBuilder<(
        (String,),
        (),
        (),
        (Option<String>,),
        (postmark::api::email::TemplateModel,),
        (),
        (),
        (),
        (),
        (),
        (),
        (),
        (),
        (),
        (),
    )>,
>
where
    S: Into<String>,
    V: Serialize,
{
    Ok(SendEmailWithTemplateRequest::builder()
        .from(env::var("MAIL_FROM").context("MAIL_FROM not set")?)
        .template_alias(template_id)
        .template_model(params))
}

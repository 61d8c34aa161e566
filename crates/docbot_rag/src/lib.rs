pub mod chunk;
pub mod embed;
pub mod index;
pub mod llm;
pub mod openai;
pub mod pipeline;
pub mod prompt;
pub mod retrieve;

#[cfg(test)]
mod tests {
    use super::openai::OpenAiClient;

    #[test]
    fn base_url_requires_http_scheme_and_trims_trailing_slash() {
        assert!(OpenAiClient::new("https://api.openai.com/v1", "key").is_ok());
        assert!(OpenAiClient::new("http://127.0.0.1:8080/v1", "key").is_ok());

        let trimmed = OpenAiClient::new("https://api.openai.com/v1/", "key").expect("client");
        assert_eq!(trimmed.base_url(), "https://api.openai.com/v1");

        assert!(OpenAiClient::new("ftp://api.openai.com/v1", "key").is_err());
        assert!(OpenAiClient::new("api.openai.com/v1", "key").is_err());
    }

    #[test]
    fn api_key_must_not_be_blank() {
        let err = OpenAiClient::new("https://api.openai.com/v1", "   ").expect_err("blank key");
        assert_eq!(err.code, "PROVIDER_CONFIG_INVALID");
    }
}

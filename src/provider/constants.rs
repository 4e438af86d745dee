pub mod openai {
    pub const API_BASE: &str = "https://api.openai.com/";
    pub const API_VERSION: &str = "v1";
    pub const CLIENT_NAME: &str = "OpenAI.Client";
    pub const MODELS_ENDPOINT: &str = "models";
    pub const COMPLETIONS_ENDPOINT: &str = "completions";
    pub const ORGANIZATION_HEADER: &str = "OpenAI-Organization";

    pub const API_KEY_ENV_VAR: &str = "OPENAI_API_KEY";
    pub const BASE_URL_ENV_VAR: &str = "OPENAI_BASE_URL";
    pub const API_VERSION_ENV_VAR: &str = "OPENAI_API_VERSION";
    pub const ORGANIZATION_ENV_VAR: &str = "OPENAI_ORGANIZATION";
}

pub mod cpf;
pub mod cpf_cache;
pub mod cpf_filter;
pub mod db_utils;

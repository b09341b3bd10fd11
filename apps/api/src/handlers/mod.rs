pub mod bulk;
pub mod health;
pub mod maintenance;
pub mod subjects;

use std::str::FromStr;

use tutela_core::AppError;

fn parse_id<T>(value: &str) -> Result<T, AppError>
where
    T: FromStr<Err = AppError>,
{
    T::from_str(value)
}

fn parse_optional_id<T>(value: Option<&str>) -> Result<Option<T>, AppError>
where
    T: FromStr<Err = AppError>,
{
    value
        .filter(|value| !value.trim().is_empty())
        .map(parse_id)
        .transpose()
}

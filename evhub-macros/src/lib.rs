use proc_macro::TokenStream;

mod event;
mod utils;

/// 事件载荷宏
/// - 可用于结构体与枚举，自动合并 `Debug` 派生；
/// - 实现 `::evhub_core::Event`，`event_name` 默认为类型名（枚举为 `Enum.Variant`）；
/// - `#[event(aggregate = field)]` 额外实现 `::evhub_core::RoutableEvent`，
///   字段类型需可转换为 `AggregateId`（`AggregateId` 或 `Uuid`）；
/// - `#[event(name = "...")]` 覆写事件名，枚举变体可单独覆写。
#[proc_macro_attribute]
pub fn event(attr: TokenStream, item: TokenStream) -> TokenStream {
    event::expand(attr, item)
}

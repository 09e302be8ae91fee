use serde_json::json;

use crate::errors::GatewayError;
use crate::gateway::{ApiGateway, GatewayRequest, GatewayResponse};

pub const PRODUCT_LIST_PATH: &str = "/product/list";
pub const ORDER_LIST_PATH: &str = "/order/list";
pub const ORDER_BY_NUMBER_PATH: &str = "/order/getOrderByNumber";
pub const PRODUCT_QUERY_PATH: &str = "/product/query";

/// The CJ calls the support bot makes.
pub struct CjApi {
    gateway: ApiGateway,
}

impl CjApi {
    pub fn new(gateway: ApiGateway) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &ApiGateway {
        &self.gateway
    }

    pub async fn list_products(&self, page_num: u32, page_size: u32) -> Result<GatewayResponse, GatewayError> {
        let request = GatewayRequest::post(
            PRODUCT_LIST_PATH,
            json!({ "pageNum": page_num, "pageSize": page_size }),
        );
        self.gateway.call(&request).await
    }

    pub async fn product_by_id(&self, pid: &str) -> Result<GatewayResponse, GatewayError> {
        let request = GatewayRequest::get(PRODUCT_QUERY_PATH).with_query("pid", pid);
        self.gateway.call(&request).await
    }

    pub async fn list_orders(&self, email: &str, page_num: u32, page_size: u32) -> Result<GatewayResponse, GatewayError> {
        let request = GatewayRequest::post(
            ORDER_LIST_PATH,
            json!({ "pageNum": page_num, "pageSize": page_size, "email": email }),
        );
        self.gateway.call(&request).await
    }

    pub async fn order_by_number(&self, order_number: &str) -> Result<GatewayResponse, GatewayError> {
        let request = GatewayRequest::post(ORDER_BY_NUMBER_PATH, json!({ "orderNumber": order_number }));
        self.gateway.call(&request).await
    }
}

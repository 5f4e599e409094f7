use catalog_products::{Product, ProductDraft, ProductPatch};

// -------------------------
// Request DTOs
// -------------------------

/// Body of `POST /api/products/` and `PUT /api/products/{id}/`.
pub type ProductRequest = ProductDraft;

/// Body of `PATCH /api/products/{id}/`.
pub type PatchProductRequest = ProductPatch;

// -------------------------
// Response mapping
// -------------------------

/// Prices are rendered as fixed two-decimal strings.
pub fn product_to_json(product: &Product) -> serde_json::Value {
    serde_json::json!({
        "id": product.id().get(),
        "sku": product.sku().as_str(),
        "name": product.name(),
        "category": product.category(),
        "price": product.price().to_string(),
        "stock_qty": product.stock_qty(),
        "status": product.status().as_str(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_core::ProductId;
    use catalog_products::{ProductFields, ProductStatus, Sku};

    #[test]
    fn product_json_shape() {
        let fields = ProductFields::new(
            "Widget",
            "Tools",
            "10".parse().unwrap(),
            -3,
            ProductStatus::Inactive,
        )
        .unwrap();
        let product = Product::new(ProductId::new(7), Sku::parse("A1").unwrap(), fields);

        assert_eq!(
            product_to_json(&product),
            serde_json::json!({
                "id": 7,
                "sku": "A1",
                "name": "Widget",
                "category": "Tools",
                "price": "10.00",
                "stock_qty": -3,
                "status": "inactive",
            })
        );
    }
}

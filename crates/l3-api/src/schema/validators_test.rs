//! Unit tests for validators and converters

#[cfg(test)]
mod tests {
    use crate::schema::converters::*;
    use crate::schema::validators::*;
    use crate::schema::{ResourceKind, EXTERNAL_GW_INFO};
    use serde_json::{json, Value};

    fn gateway_validator() -> Validator {
        ResourceKind::Router
            .schema()
            .get(EXTERNAL_GW_INFO)
            .and_then(|attr| attr.validate.clone())
            .unwrap()
    }

    #[test]
    fn test_uuid() {
        assert!(validate_uuid(&json!("5a0e1d8c-2a1f-4b1e-9a4b-0f9a1c2d3e4f")).is_ok());
        assert!(validate_uuid(&json!("not-a-uuid")).is_err());
        assert!(validate_uuid(&Value::Null).is_err());
        assert!(validate_uuid_or_none(&Value::Null).is_ok());
        assert!(validate_uuid_or_none(&json!(42)).is_err());
    }

    #[test]
    fn test_string_max_length() {
        assert!(validate_string(&json!("router1"), 255).is_ok());
        assert!(validate_string(&json!("x".repeat(255)), 255).is_ok());
        let err = validate_string(&json!("x".repeat(256)), 255).unwrap_err();
        assert!(err.contains("exceeds maximum length of 255"), "{}", err);
        assert!(validate_string(&json!(7), 255).is_err());
    }

    #[test]
    fn test_ip_address_or_none() {
        assert!(validate_ip_address_or_none(&Value::Null).is_ok());
        assert!(validate_ip_address_or_none(&json!("172.24.4.10")).is_ok());
        assert!(validate_ip_address_or_none(&json!("2001:db8::1")).is_ok());
        assert!(validate_ip_address_or_none(&json!("172.24.4.300")).is_err());
        assert!(validate_ip_address_or_none(&json!("")).is_err());
    }

    #[test]
    fn test_fixed_ips() {
        let subnet = "5a0e1d8c-2a1f-4b1e-9a4b-0f9a1c2d3e4f";
        assert!(validate_fixed_ips(&json!([])).is_ok());
        assert!(validate_fixed_ips(&json!([{"subnet_id": subnet, "ip_address": "10.0.0.5"}])).is_ok());
        assert!(validate_fixed_ips(&json!([{"subnet_id": subnet}])).is_ok());

        assert!(validate_fixed_ips(&json!({"ip_address": "10.0.0.5"})).is_err());
        assert!(validate_fixed_ips(&json!(["10.0.0.5"])).is_err());
        assert!(validate_fixed_ips(&json!([{"ip_address": "bogus"}])).is_err());
        assert!(validate_fixed_ips(&json!([{"subnet_id": "bogus"}])).is_err());

        let err = validate_fixed_ips(&json!([
            {"ip_address": "10.0.0.5"},
            {"ip_address": "10.0.0.5"}
        ]))
        .unwrap_err();
        assert!(err.contains("Duplicate IP address"), "{}", err);
    }

    #[test]
    fn test_gateway_info_absent_is_valid() {
        let validator = gateway_validator();
        assert!(validator.validate(&mut Value::Null).is_ok());
        assert!(validator.validate(&mut json!({})).is_ok());
    }

    #[test]
    fn test_gateway_info_well_formed() {
        let validator = gateway_validator();
        let mut value = json!({"network_id": "5a0e1d8c-2a1f-4b1e-9a4b-0f9a1c2d3e4f"});
        assert!(validator.validate(&mut value).is_ok());

        let mut value = json!({
            "network_id": "5a0e1d8c-2a1f-4b1e-9a4b-0f9a1c2d3e4f",
            "external_fixed_ips": [{"ip_address": "172.24.4.5"}]
        });
        assert!(validator.validate(&mut value).is_ok());
    }

    #[test]
    fn test_gateway_info_malformed() {
        let validator = gateway_validator();

        let err = validator.validate(&mut json!({"external_fixed_ips": []})).unwrap_err();
        assert!(err.contains("network_id"), "{}", err);

        assert!(validator.validate(&mut json!({"network_id": "nope"})).is_err());
        assert!(validator.validate(&mut json!("5a0e1d8c-2a1f-4b1e-9a4b-0f9a1c2d3e4f")).is_err());
        assert!(validator
            .validate(&mut json!({
                "network_id": "5a0e1d8c-2a1f-4b1e-9a4b-0f9a1c2d3e4f",
                "external_fixed_ips": [{"ip_address": "not-an-ip"}]
            }))
            .is_err());
    }

    #[test]
    fn test_gateway_info_converts_kvp_fixed_ips() {
        let validator = gateway_validator();
        let mut value = json!({
            "network_id": "5a0e1d8c-2a1f-4b1e-9a4b-0f9a1c2d3e4f",
            "external_fixed_ips": ["subnet_id=1b2c3d4e-5f60-4718-8a9b-0c1d2e3f4a5b,ip_address=172.24.4.5"]
        });
        validator.validate(&mut value).unwrap();
        assert_eq!(
            value["external_fixed_ips"],
            json!([{
                "subnet_id": "1b2c3d4e-5f60-4718-8a9b-0c1d2e3f4a5b",
                "ip_address": "172.24.4.5"
            }])
        );
    }

    #[test]
    fn test_convert_to_boolean() {
        assert_eq!(convert_to_boolean(&json!(true)).unwrap(), json!(true));
        assert_eq!(convert_to_boolean(&json!("False")).unwrap(), json!(false));
        assert_eq!(convert_to_boolean(&json!("1")).unwrap(), json!(true));
        assert_eq!(convert_to_boolean(&json!(0)).unwrap(), json!(false));
        assert!(convert_to_boolean(&json!("yes")).is_err());
        assert!(convert_to_boolean(&json!(2)).is_err());
        assert!(convert_to_boolean(&Value::Null).is_err());
    }

    #[test]
    fn test_convert_kvp_list_to_dict() {
        let list = vec!["a=1".to_string(), "a=2".to_string(), "a=1".to_string(), "b=".to_string()];
        let dict = convert_kvp_list_to_dict(&list).unwrap();
        assert_eq!(dict["a"], json!(["1", "2"]));
        assert_eq!(dict["b"], json!([""]));

        assert!(convert_kvp_list_to_dict(&["novalue".to_string()]).is_err());
        assert!(convert_kvp_list_to_dict(&["=x".to_string()]).is_err());
    }

    #[test]
    fn test_kvp_converter_on_plain_list() {
        let converted = Converter::KvpListToDict.apply(&json!(["a=1", "b=2"])).unwrap();
        assert_eq!(converted, json!({"a": ["1"], "b": ["2"]}));
        assert!(Converter::KvpListToDict.apply(&json!([1])).is_err());
    }
}

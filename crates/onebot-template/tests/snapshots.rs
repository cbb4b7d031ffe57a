use insta::assert_snapshot;
use onebot_template::{onebot, Context, Function, Value};
use serde_json::json;

fn search_reply() -> onebot_template::Template {
    onebot()
        .build(
            "以下为以图搜番结果:{% each item in data.result max 3 %}\n--------\n\
             {% if item.anilist.isAdult %}(NSFW Content){% else %}{{item.image|image}}{% end %}\n\
             番剧名称:{{ item.anilist.title.native }}\n\
             相似度:{{item.similarity}}{% end %}",
        )
        .unwrap()
}

#[test]
fn test_snapshot_search_reply() {
    let ctx = Context::new().with(
        "data",
        Value::from(json!({
            "result": [
                {
                    "anilist": {"isAdult": false, "title": {"native": "葬送のフリーレン"}},
                    "image": "https://media.trace.moe/image/1?t=1,2",
                    "similarity": 0.98,
                },
                {
                    "anilist": {"isAdult": true, "title": {"native": "&[x]"}},
                    "image": "https://media.trace.moe/image/2",
                    "similarity": 0.81,
                },
            ]
        })),
    );

    assert_snapshot!(search_reply().render(&ctx).unwrap(), @r"
    以下为以图搜番结果:
    --------
    [CQ:image,file=https://media.trace.moe/image/1?t=1&#44;2,cache=true,proxy=true]
    番剧名称:葬送のフリーレン
    相似度:0.98
    --------
    (NSFW Content)
    番剧名称:&amp;&#91;x&#93;
    相似度:0.81
    ");
}

#[test]
fn test_snapshot_empty_search_reply() {
    let ctx = Context::new().with("data", Value::from(json!({"result": []})));
    assert_snapshot!(search_reply().render(&ctx).unwrap(), @"以下为以图搜番结果:");
}

#[test]
fn test_snapshot_help_listing() {
    let template = onebot()
        .build(
            "{{ bot }} commands:{% each cmd in commands %}\n\
             - {{ cmd.name }}{% if cmd.aliases %} ({% call ..join cmd.aliases %}){% end %}{% end %}\n\
             {% call footer %}",
        )
        .unwrap();

    let ctx = Context::new()
        .with("bot", "Izumi")
        .with(
            "commands",
            Value::from(json!([
                {"name": "anime_search", "aliases": ["搜番", "以图搜番"]},
                {"name": "help", "aliases": []},
            ])),
        )
        .with(
            "join",
            Function::new("join", |args| {
                let items = args.arg(0).and_then(Value::as_list).unwrap_or_default();
                Ok(Value::from(
                    items.iter().map(Value::to_string).collect::<Vec<_>>().join(", "),
                ))
            }),
        )
        .with("footer", Function::new("footer", |_| Ok(Value::from("[end]"))));

    assert_snapshot!(template.render(&ctx).unwrap(), @r"
    Izumi commands:
    - anime_search (搜番, 以图搜番)
    - help
    [end]
    ");
}
